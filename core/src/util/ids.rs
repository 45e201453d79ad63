use chrono::Local;
use uuid::Uuid;

/// Generated format: exec-{YYYYMMDDHHmmss}-{random8}
pub fn generate_execution_id() -> String {
    let ts = Local::now().format("%Y%m%d%H%M%S");
    let uuid = Uuid::new_v4().simple().to_string();
    let suffix = &uuid[..8];
    format!("exec-{}-{}", ts, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn execution_id_shape() {
        let id = generate_execution_id();
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts[0], "exec");
        assert_eq!(parts[1].len(), 14);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 8);
    }

    #[test]
    fn execution_ids_are_unique() {
        let mut ids = HashSet::new();
        for _ in 0..200 {
            let id = generate_execution_id();
            assert!(ids.insert(id.clone()), "Duplicate ID: {}", id);
        }
    }
}
