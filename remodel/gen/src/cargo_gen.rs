//! `Cargo.toml` generation for the generated crate.

/// Dependencies of the generated crate, as `(name, requirement)` TOML values.
const DEPENDENCIES: &[(&str, &str)] = &[
    (
        "reqwest",
        r#"{ version = "0.12", default-features = false, features = ["json", "rustls-tls"] }"#,
    ),
    ("serde", r#"{ version = "1.0", features = ["derive"] }"#),
    ("serde_json", r#""1.0""#),
    ("thiserror", r#""2.0""#),
    ("tokio", r#"{ version = "1.48", features = ["time"] }"#),
    ("tracing", r#""0.1""#),
];

/// Renders the generated crate's manifest.
///
/// ```
/// use remodel_gen::cargo_gen::generate_cargo_toml;
///
/// let manifest = generate_cargo_toml("cmsgov");
/// assert!(manifest.contains("name = \"cmsgov\""));
/// ```
pub fn generate_cargo_toml(crate_name: &str) -> String {
    let mut manifest = format!(
        "# This file was automatically generated by remodel. Do not edit manually.\n\
         \n\
         [package]\n\
         name = \"{crate_name}\"\n\
         version = \"0.1.0\"\n\
         edition = \"2024\"\n\
         description = \"Clients and models for CMS.gov APIs\"\n\
         publish = false\n\
         \n\
         [dependencies]\n"
    );
    for (name, requirement) in DEPENDENCIES {
        manifest.push_str(&format!("{name} = {requirement}\n"));
    }
    manifest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_is_valid_toml() {
        let manifest: toml::Value = toml::from_str(&generate_cargo_toml("cmsgov")).unwrap();
        assert_eq!(manifest["package"]["name"].as_str(), Some("cmsgov"));
        assert_eq!(manifest["package"]["edition"].as_str(), Some("2024"));
        assert!(manifest["dependencies"].get("reqwest").is_some());
        assert_eq!(
            manifest["dependencies"]["tokio"]["features"][0].as_str(),
            Some("time")
        );
    }

    #[test]
    fn every_runtime_dependency_is_declared() {
        let manifest: toml::Value = toml::from_str(&generate_cargo_toml("cmsgov")).unwrap();
        for name in ["serde", "serde_json", "thiserror", "tracing"] {
            assert!(manifest["dependencies"].get(name).is_some(), "missing {name}");
        }
    }
}
