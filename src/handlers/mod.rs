// Handlers by security tier:
// public (no auth) -> protected (bearer auth + permission) -> elevated (admin role)
pub mod elevated;
pub mod protected;
pub mod public;
