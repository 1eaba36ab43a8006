// Handlers behind the bearer authentication middleware. Each one checks its
// own permission through `CurrentUser`.
pub mod session;
pub mod users;
