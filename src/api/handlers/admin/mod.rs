pub mod proofs;
pub mod users;
