pub mod case;
pub mod intersection;
pub mod signature;
pub mod validity;
