mod catalog;
mod mocks;
mod offers;
mod orders;
mod reservations;
