//! Read-only sample profiles shipped for onboarding.

use crate::services::database::traits::{ConnectionProfile, EngineType};

const SAMPLE_HOST: &str = "mysql8.cqlphmp676ly.ap-northeast-3.rds.amazonaws.com";

/// Id of the university disclosure sample.
pub const SAMPLE_EDU_ID: &str = "sample-edu-mysql";
/// Id of the futures industry sample.
pub const SAMPLE_FU_ID: &str = "sample-fu-mysql";

fn sample(id: &str, title: &str, account: &str, database: &str) -> ConnectionProfile {
    ConnectionProfile {
        id: id.to_string(),
        title: title.to_string(),
        engine_type: EngineType::MySQL,
        host: SAMPLE_HOST.to_string(),
        port: 3306,
        username: account.to_string(),
        password: account.to_string(),
        database: Some(database.to_string()),
        ssl: None,
    }
}

/// The two public read-only MySQL datasets.
pub fn sample_profiles() -> Vec<ConnectionProfile> {
    vec![
        sample(
            SAMPLE_EDU_ID,
            "University public disclosure data",
            "edu_public_read",
            "edu_public_data",
        ),
        sample(
            SAMPLE_FU_ID,
            "Futures industry public data",
            "fu_public_read",
            "fu_public_data",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_profiles() {
        let samples = sample_profiles();
        assert_eq!(samples.len(), 2);
        assert!(samples.iter().all(|p| p.engine_type == EngineType::MySQL));
        assert!(samples.iter().all(|p| p.username == p.password));
        assert_eq!(samples[0].id, SAMPLE_EDU_ID);
        assert_eq!(samples[1].database.as_deref(), Some("fu_public_data"));
    }
}
