// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Compilation environment.
//!
//! Everything the front-end would otherwise read from process-wide state is
//! carried by a [`CompilerEnv`] that callers construct once and pass down.

use std::sync::Arc;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use rustc_hash::FxHashSet;

use crate::error::{Error, Result};

/// Default limit on syntax-tree nesting while lowering.
pub const DEFAULT_MAX_SYNTAX_DEPTH: usize = 128;

/// Default limit on IR nesting during normalization.
pub const DEFAULT_MAX_IR_DEPTH: usize = 512;

/// JavaScript language version tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum LanguageVersion {
    /// Unspecified, latest behaviour
    Default = 0,
    /// JavaScript 1.0
    V1_0 = 100,
    /// JavaScript 1.1
    V1_1 = 110,
    /// JavaScript 1.2
    V1_2 = 120,
    /// JavaScript 1.3
    V1_3 = 130,
    /// JavaScript 1.4
    V1_4 = 140,
    /// JavaScript 1.5
    V1_5 = 150,
    /// JavaScript 1.6
    V1_6 = 160,
}

/// Settings shared by every unit compiled from one program.
#[derive(Debug, Clone)]
pub struct CompilerEnv {
    language_version: LanguageVersion,
    source_name: Arc<str>,
    activation_names: FxHashSet<String>,
    max_syntax_depth: usize,
    max_ir_depth: usize,
}

impl CompilerEnv {
    /// Starts building an environment.
    pub fn builder() -> CompilerEnvBuilder {
        CompilerEnvBuilder::default()
    }

    /// Language version the script is compiled for.
    pub fn language_version(&self) -> LanguageVersion {
        self.language_version
    }

    /// Source file identity.
    pub fn source_name(&self) -> &Arc<str> {
        &self.source_name
    }

    /// Returns true if referencing `name` forces an activation record.
    pub fn is_activation_name(&self, name: &str) -> bool {
        self.activation_names.contains(name)
    }

    /// Syntax nesting limit.
    pub fn max_syntax_depth(&self) -> usize {
        self.max_syntax_depth
    }

    /// IR nesting limit.
    pub fn max_ir_depth(&self) -> usize {
        self.max_ir_depth
    }
}

impl Default for CompilerEnv {
    fn default() -> Self {
        Self {
            language_version: LanguageVersion::Default,
            source_name: Arc::from("<unknown>"),
            activation_names: FxHashSet::default(),
            max_syntax_depth: DEFAULT_MAX_SYNTAX_DEPTH,
            max_ir_depth: DEFAULT_MAX_IR_DEPTH,
        }
    }
}

/// Builder for [`CompilerEnv`].
#[derive(Debug, Default)]
pub struct CompilerEnvBuilder {
    language_version: Option<LanguageVersion>,
    source_name: Option<String>,
    activation_names: Vec<String>,
    max_syntax_depth: Option<usize>,
    max_ir_depth: Option<usize>,
}

impl CompilerEnvBuilder {
    /// Sets the language version.
    pub fn language_version(mut self, version: LanguageVersion) -> Self {
        self.language_version = Some(version);
        self
    }

    /// Sets the source file name.
    pub fn source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    /// Registers a name whose use requires an activation record.
    pub fn activation_name(mut self, name: impl Into<String>) -> Self {
        self.activation_names.push(name.into());
        self
    }

    /// Sets the syntax nesting limit.
    pub fn max_syntax_depth(mut self, depth: usize) -> Self {
        self.max_syntax_depth = Some(depth);
        self
    }

    /// Sets the IR nesting limit.
    pub fn max_ir_depth(mut self, depth: usize) -> Self {
        self.max_ir_depth = Some(depth);
        self
    }

    /// Validates the settings and creates the environment.
    pub fn build(self) -> Result<CompilerEnv> {
        let defaults = CompilerEnv::default();
        let max_syntax_depth = self.max_syntax_depth.unwrap_or(defaults.max_syntax_depth);
        let max_ir_depth = self.max_ir_depth.unwrap_or(defaults.max_ir_depth);
        if max_syntax_depth == 0 || max_ir_depth == 0 {
            return Err(Error::InvalidEnv("nesting limits must be positive"));
        }
        if self.activation_names.iter().any(String::is_empty) {
            return Err(Error::InvalidEnv("activation names must not be empty"));
        }
        Ok(CompilerEnv {
            language_version: self.language_version.unwrap_or(defaults.language_version),
            source_name: self
                .source_name
                .map(Arc::from)
                .unwrap_or(defaults.source_name),
            activation_names: self.activation_names.into_iter().collect(),
            max_syntax_depth,
            max_ir_depth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_defaults() {
        let env = CompilerEnv::builder().build().unwrap();
        assert_eq!(env.language_version(), LanguageVersion::Default);
        assert_eq!(env.max_syntax_depth(), DEFAULT_MAX_SYNTAX_DEPTH);
        assert!(!env.is_activation_name("arguments"));
    }

    #[test]
    fn test_env_rejects_zero_depth() {
        let result = CompilerEnv::builder().max_ir_depth(0).build();
        assert!(matches!(result, Err(Error::InvalidEnv(_))));
    }

    #[test]
    fn test_env_rejects_empty_activation_name() {
        let result = CompilerEnv::builder().activation_name("").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_language_version_from_code() {
        assert_eq!(LanguageVersion::try_from(120).unwrap(), LanguageVersion::V1_2);
        assert!(LanguageVersion::try_from(121).is_err());
    }
}
