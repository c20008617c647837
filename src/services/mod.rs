pub mod s3_service;

#[cfg(test)]
pub mod fake_presigner;
