pub mod presign_model;
