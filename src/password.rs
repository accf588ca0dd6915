use argon2::{
	password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
	Argon2,
};

/// Hashes a password with a fresh random salt, returning a PHC string.
pub fn hash(hasher: &Argon2, password: &str) -> Result<String, argon2::password_hash::Error> {
	let salt = SaltString::generate(&mut OsRng);

	Ok(hasher.hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Checks `password` against a stored PHC string.
///
/// A malformed stored hash never verifies.
pub fn verify(hasher: &Argon2, password: &str, hash: &str) -> bool {
	PasswordHash::new(hash)
		.map(|hash| hasher.verify_password(password.as_bytes(), &hash).is_ok())
		.unwrap_or(false)
}
