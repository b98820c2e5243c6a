pub mod guard;
pub mod health;
pub mod pages;
