//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

use crate::error::Error;
use crate::frontend::Frontend;

use serde::Deserialize;

/// Options that influence how IR is built, loadable from a TOML file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings
{
	#[serde(deserialize_with = "deserialize_frontend")]
	pub frontend: Frontend,
	/// Fail on a name that no enclosing scope knows, instead of binding it
	/// to the local scope.
	pub strict_scoping: bool,
	pub preprocess: bool,
	pub includes: Vec<std::path::PathBuf>,
	pub defines: Vec<String>,
	pub preprocessor: Option<std::path::PathBuf>,
	pub infer_allocatable_shapes: bool,
}

impl Default for Settings
{
	fn default() -> Settings
	{
		Settings {
			frontend: Frontend::default(),
			strict_scoping: false,
			preprocess: false,
			includes: Vec::new(),
			defines: Vec::new(),
			preprocessor: None,
			infer_allocatable_shapes: true,
		}
	}
}

impl Settings
{
	pub fn from_toml(raw: &str) -> Result<Settings, Error>
	{
		let value: toml::Value = toml::from_str(raw).map_err(config_error)?;
		if let Some(name) = value.get("frontend").and_then(|x| x.as_str())
		{
			name.parse::<Frontend>()?;
		}
		Settings::deserialize(value).map_err(config_error)
	}

	pub fn from_toml_file(filename: &std::path::Path) -> Result<Settings, Error>
	{
		let raw = std::fs::read_to_string(filename).map_err(|source| {
			Error::Io {
				path: filename.to_string_lossy().to_string(),
				source,
			}
		})?;
		Settings::from_toml(&raw)
	}

	/// The C preprocessor to run, in order of preference: the configured
	/// one, the `WEFT_CPP` environment variable, or `cpp`.
	pub fn preprocessor(&self) -> std::path::PathBuf
	{
		if let Some(preprocessor) = &self.preprocessor
		{
			preprocessor.clone()
		}
		else if let Ok(preprocessor) = std::env::var("WEFT_CPP")
		{
			preprocessor.into()
		}
		else
		{
			"cpp".into()
		}
	}
}

fn config_error(error: toml::de::Error) -> Error
{
	Error::Config {
		message: error.to_string(),
	}
}

/// Dialect names are matched the same way as on the command line.
fn deserialize_frontend<'de, D>(deserializer: D) -> Result<Frontend, D::Error>
where
	D: serde::Deserializer<'de>,
{
	let name = String::deserialize(deserializer)?;
	name.parse().map_err(serde::de::Error::custom)
}
