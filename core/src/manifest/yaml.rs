use std::{
    collections::HashSet,
    env,
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
};

use regex::{Captures, Regex};

use crate::{helpers::load_env_from_full_path, manifest::core::Manifest};

pub const YAML_CONFIG_NAME: &str = "ethbridge.yaml";

#[derive(thiserror::Error, Debug)]
pub enum ValidateManifestError {
    #[error("Network names {0} must be unique")]
    NetworkNameMustBeUnique(String),

    #[error("Stream ids {0} must be unique")]
    StreamIdMustBeUnique(String),

    #[error("Streams config is invalid: {0}")]
    StreamsConfigValidationError(String),
}

fn validate_manifest(manifest: &Manifest) -> Result<(), ValidateManifestError> {
    let mut seen = HashSet::new();
    let duplicate_networks: Vec<String> = manifest
        .networks
        .iter()
        .filter_map(|n| if seen.insert(&n.name) { None } else { Some(n.name.clone()) })
        .collect();

    if !duplicate_networks.is_empty() {
        return Err(ValidateManifestError::NetworkNameMustBeUnique(duplicate_networks.join(", ")));
    }

    let mut seen = HashSet::new();
    let duplicate_streams: Vec<String> = manifest
        .streams
        .iter()
        .filter_map(|s| if seen.insert(&s.id) { None } else { Some(s.id.clone()) })
        .collect();

    if !duplicate_streams.is_empty() {
        return Err(ValidateManifestError::StreamIdMustBeUnique(duplicate_streams.join(", ")));
    }

    for stream in &manifest.streams {
        if let Err(e) = stream.validate() {
            return Err(ValidateManifestError::StreamsConfigValidationError(e));
        }
    }

    Ok(())
}

#[derive(thiserror::Error, Debug)]
pub enum ReadManifestError {
    #[error("Could not open file: {0}")]
    CouldNotOpenFile(#[from] std::io::Error),

    #[error("Could not parse manifest: {0}")]
    CouldNotParseManifest(#[from] serde_yaml::Error),

    #[error("Could not substitute env variables: {0}")]
    CouldNotSubstituteEnvVariables(#[from] regex::Error),

    #[error("Environment variable {0} not found")]
    MissingEnvVariable(String),

    #[error("Could not validate manifest: {0}")]
    CouldNotValidateManifest(#[from] ValidateManifestError),
}

fn substitute_env_variables(contents: &str) -> Result<String, ReadManifestError> {
    let re = Regex::new(r"\$\{([^}]+)\}")?;
    for caps in re.captures_iter(contents) {
        let var_name = &caps[1];
        if env::var(var_name).is_err() {
            return Err(ReadManifestError::MissingEnvVariable(var_name.to_string()));
        }
    }
    let result = re.replace_all(contents, |caps: &Captures| {
        env::var(&caps[1]).unwrap_or_default()
    });
    Ok(result.into_owned())
}

fn extract_environment_path(contents: &str, file_path: &Path) -> Option<PathBuf> {
    let re = Regex::new(r"(?m)^environment_path:\s*(.+)$").ok()?;
    re.captures(contents).and_then(|cap| cap.get(1)).map(|m| {
        let path_str = m.as_str().trim().replace('"', "");
        let base_dir = file_path.parent().unwrap_or(Path::new(""));
        let full_path = base_dir.join(path_str);
        full_path.canonicalize().unwrap_or(full_path)
    })
}

pub fn read_manifest(file_path: &PathBuf) -> Result<Manifest, ReadManifestError> {
    let mut file = File::open(file_path)?;
    let mut contents = String::new();

    file.read_to_string(&mut contents)?;

    if let Some(path) = extract_environment_path(&contents, file_path) {
        load_env_from_full_path(&path);
    }

    let contents = substitute_env_variables(&contents)?;
    let manifest: Manifest = serde_yaml::from_str(&contents)?;
    validate_manifest(&manifest)?;

    Ok(manifest)
}

#[derive(thiserror::Error, Debug)]
pub enum WriteManifestError {
    #[error("Could not parse manifest to string: {0}")]
    CouldNotTurnManifestToString(serde_yaml::Error),

    #[error("Could not create file: {0}")]
    CouldNotCreateFile(std::io::Error),

    #[error("Could not write to file: {0}")]
    CouldNotWriteToFile(std::io::Error),
}

pub fn write_manifest(data: &Manifest, file_path: &PathBuf) -> Result<(), WriteManifestError> {
    let yaml_string =
        serde_yaml::to_string(data).map_err(WriteManifestError::CouldNotTurnManifestToString)?;

    let mut file = File::create(file_path).map_err(WriteManifestError::CouldNotCreateFile)?;
    file.write_all(yaml_string.as_bytes()).map_err(WriteManifestError::CouldNotWriteToFile)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    fn write_yaml(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join(YAML_CONFIG_NAME);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_manifest_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_yaml(
            &dir,
            r#"
name: bridge
networks:
  - name: mainnet
    chain_id: 1
    rpc: http://localhost:8545
streams:
  - id: dev
    webhook:
      endpoint: http://localhost:9000/hook
"#,
        );

        let manifest = read_manifest(&path).unwrap();
        assert_eq!(manifest.name, "bridge");
        assert_eq!(manifest.network_by_name("mainnet").unwrap().rpc, "http://localhost:8545");
        assert_eq!(manifest.streams[0].id, "dev");
        // default budget applies when unset
        assert_eq!(manifest.call_timeout(), std::time::Duration::from_secs(30));

        let out = dir.path().join("out.yaml");
        write_manifest(&manifest, &out).unwrap();
        let reread = read_manifest(&out).unwrap();
        assert_eq!(reread.networks[0].chain_id, manifest.networks[0].chain_id);
    }

    #[test]
    fn test_read_manifest_substitutes_env_variables() {
        std::env::set_var("ETHBRIDGE_TEST_RPC_URL", "http://localhost:8545");
        let dir = tempfile::tempdir().unwrap();
        let path = write_yaml(
            &dir,
            r#"
name: bridge
networks:
  - name: mainnet
    chain_id: 1
    rpc: ${ETHBRIDGE_TEST_RPC_URL}
"#,
        );

        let manifest = read_manifest(&path).unwrap();
        assert_eq!(manifest.networks[0].rpc, "http://localhost:8545");
    }

    #[test]
    fn test_read_manifest_fails_on_missing_env_variable() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_yaml(
            &dir,
            r#"
name: bridge
networks:
  - name: mainnet
    chain_id: 1
    rpc: ${ETHBRIDGE_TEST_UNSET_VARIABLE}
"#,
        );

        let err = read_manifest(&path).unwrap_err();
        assert!(matches!(
            err,
            ReadManifestError::MissingEnvVariable(name) if name == "ETHBRIDGE_TEST_UNSET_VARIABLE"
        ));
    }

    #[test]
    fn test_read_manifest_rejects_duplicate_stream_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_yaml(
            &dir,
            r#"
name: bridge
networks:
  - name: mainnet
    chain_id: 1
    rpc: http://localhost:8545
streams:
  - id: dev
    webhook:
      endpoint: http://localhost:9000/a
  - id: dev
    webhook:
      endpoint: http://localhost:9000/b
"#,
        );

        let err = read_manifest(&path).unwrap_err();
        assert!(matches!(
            err,
            ReadManifestError::CouldNotValidateManifest(
                ValidateManifestError::StreamIdMustBeUnique(_)
            )
        ));
    }

    #[test]
    fn test_read_manifest_rejects_stream_without_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_yaml(
            &dir,
            r#"
name: bridge
networks:
  - name: mainnet
    chain_id: 1
    rpc: http://localhost:8545
streams:
  - id: dev
"#,
        );

        let err = read_manifest(&path).unwrap_err();
        assert!(matches!(
            err,
            ReadManifestError::CouldNotValidateManifest(
                ValidateManifestError::StreamsConfigValidationError(_)
            )
        ));
    }
}
