use keepfs_config::KeepFsConfig;

const REDACTED: &str = "********";

/// Copy of `config` with inline secrets masked.
pub fn redacted(config: &KeepFsConfig) -> KeepFsConfig {
    let mut config = config.clone();
    if let Some(ref mut credentials) = config.credentials {
        if credentials.password.is_some() {
            credentials.password = Some(REDACTED.to_string());
        }
    }
    config
}

pub fn run(config: &KeepFsConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", redacted(config).to_yaml()?);
    Ok(())
}
