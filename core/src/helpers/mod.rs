use std::path::Path;

use rand::{distr::Alphanumeric, Rng};
use tracing::error;

/// Random alphanumeric id, used for subscription ids.
pub fn generate_random_id(len: usize) -> String {
    rand::rng().sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}

pub fn load_env_from_full_path(path: &Path) {
    if dotenv::from_path(path).is_err() {
        error!("Could not load the env file at {}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_random_id() {
        let id = generate_random_id(16);
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, generate_random_id(16));
    }
}
