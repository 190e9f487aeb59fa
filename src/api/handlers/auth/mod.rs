pub mod login;
pub mod principal;
pub mod reset;
pub mod session;
pub mod signup;
pub mod storage;
#[cfg(test)]
pub(crate) mod test_support;
pub mod types;
pub(crate) mod utils;
pub mod verify;
