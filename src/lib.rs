pub mod cli;
pub mod document;
pub mod fasit;
pub mod mapper;
pub mod naisd;
pub mod naiserator;
