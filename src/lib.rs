pub mod bcp;
pub mod cleanup;
pub mod fetch;
pub mod harvest;
pub mod layout;
pub mod metadata;
pub mod ni;
pub mod sources;
pub mod usa;
