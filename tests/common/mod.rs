pub mod synthetic_patch;
