pub mod enumerate;
pub mod slice2d;
pub mod vertices;
