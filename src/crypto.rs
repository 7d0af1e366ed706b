pub mod chaum_pedersen;
pub mod dlog;
pub mod elgamal;
pub mod group;
pub mod hash;
pub mod schnorr;
