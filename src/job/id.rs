//! Job identifiers: `{command}_{6 ASCII digits}`.

use rand::Rng;

/// Number of random digits in a job id.
pub const ID_DIGITS: usize = 6;

/// Attempts before giving up on finding a free id.
const MAX_ATTEMPTS: usize = 32;

/// Draw a random id for a job of `command`.
pub fn generate_job_id(command: &str) -> String {
    let suffix: u32 = rand::rng().random_range(0..1_000_000);
    format!("{}_{:06}", command, suffix)
}

/// Draw ids until `is_taken` rejects none of them. `None` when every attempt
/// collided, which in practice means a million live jobs of one command.
pub fn unique_job_id(command: &str, is_taken: impl Fn(&str) -> bool) -> Option<String> {
    (0..MAX_ATTEMPTS)
        .map(|_| generate_job_id(command))
        .find(|id| !is_taken(id))
}

/// Whether `value` has the shape of a job id.
pub fn is_job_id(value: &str) -> bool {
    match value.rsplit_once('_') {
        Some((command, digits)) => {
            !command.is_empty()
                && digits.len() == ID_DIGITS
                && digits.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_have_fixed_shape() {
        for _ in 0..200 {
            let id = generate_job_id("sleep");
            assert!(id.starts_with("sleep_"));
            assert_eq!(id.len(), "sleep_".len() + ID_DIGITS);
            assert!(is_job_id(&id), "{id}");
        }
    }

    #[test]
    fn test_unique_job_id_skips_taken() {
        let mut taken = HashSet::new();
        for _ in 0..50 {
            let id = unique_job_id("set", |candidate| taken.contains(candidate)).unwrap();
            assert!(taken.insert(id));
        }
    }

    #[test]
    fn test_unique_job_id_gives_up() {
        assert_eq!(unique_job_id("x", |_| true), None);
    }

    #[test]
    fn test_is_job_id() {
        assert!(is_job_id("jobs_000123"));
        assert!(is_job_id("my_cmd_123456"));
        assert!(!is_job_id("jobs_12345"));
        assert!(!is_job_id("jobs_12a456"));
        assert!(!is_job_id("_123456"));
        assert!(!is_job_id("jobs"));
    }
}
