pub mod revising_user;
