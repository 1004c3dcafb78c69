pub mod abf;
pub mod actitime;
