pub mod ustar;
