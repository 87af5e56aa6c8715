use once_cell::sync::Lazy;

use crate::uplc;

/// Front-end options plus the back-end's own config. Every flag is an
/// `Option<bool>` so layered defaults merge without clobbering explicit
/// settings : non-null wins, and on equal specificity the right-hand
/// side of `update` wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilationConfig {
    /// Share re-occurring patterns as functions bound at the root.
    pub compress_patterns : Option<bool>,
    /// Extract patterns one kind at a time instead of all at once.
    pub iterative_unfold_patterns : Option<bool>,
    /// Unroll list accesses at literal indices.
    pub constant_index_access_list : Option<bool>,
    /// Drop traces of literal strings.
    pub remove_trace : Option<bool>,
    /// Handed to the back-end untouched apart from the same merge rule.
    pub uplc : uplc::CompilationConfig,
}

impl CompilationConfig {
    pub fn update(&self, other : &CompilationConfig) -> CompilationConfig {
        CompilationConfig {
            compress_patterns : other.compress_patterns.or(self.compress_patterns),
            iterative_unfold_patterns : other.iterative_unfold_patterns.or(self.iterative_unfold_patterns),
            constant_index_access_list : other.constant_index_access_list.or(self.constant_index_access_list),
            remove_trace : other.remove_trace.or(self.remove_trace),
            uplc : self.uplc.update(&other.uplc),
        }
    }

    /// Merge in back-end options only.
    pub fn update_uplc(&self, other : &uplc::CompilationConfig) -> CompilationConfig {
        CompilationConfig {
            uplc : self.uplc.update(other),
            ..self.clone()
        }
    }
}

pub static OPT_O0_CONFIG : Lazy<CompilationConfig> = Lazy::new(|| {
    CompilationConfig::default()
        .update_uplc(&uplc::UPLC_OPT_O0_CONFIG)
        .update(&CompilationConfig {
            compress_patterns : Some(false),
            iterative_unfold_patterns : Some(false),
            ..CompilationConfig::default()
        })
});

pub static OPT_O1_CONFIG : Lazy<CompilationConfig> = Lazy::new(|| {
    OPT_O0_CONFIG
        .update_uplc(&uplc::UPLC_OPT_O1_CONFIG)
        .update(&CompilationConfig {
            compress_patterns : Some(true),
            constant_index_access_list : Some(true),
            ..CompilationConfig::default()
        })
});

pub static OPT_O2_CONFIG : Lazy<CompilationConfig> = Lazy::new(|| {
    OPT_O1_CONFIG.update_uplc(&uplc::UPLC_OPT_O2_CONFIG)
});

pub static OPT_O3_CONFIG : Lazy<CompilationConfig> = Lazy::new(|| {
    OPT_O2_CONFIG
        .update_uplc(&uplc::UPLC_OPT_O3_CONFIG)
        .update(&CompilationConfig {
            iterative_unfold_patterns : Some(true),
            remove_trace : Some(true),
            ..CompilationConfig::default()
        })
});

pub static DEFAULT_CONFIG : Lazy<CompilationConfig> = Lazy::new(|| {
    CompilationConfig::default().update(&OPT_O1_CONFIG)
});

/// One-sentence description per front-end option, for CLI embedders.
pub const CONFIG_HELP : [(&str, &str); 4] = [
    (
        "compress_patterns",
        "Enables the compression of re-occurring code patterns. Can reduce memory and CPU steps but increases the size of the compiled contract.",
    ),
    (
        "iterative_unfold_patterns",
        "Enables iterative unfolding of patterns. Improves application of pattern optimization but is very slow.",
    ),
    (
        "constant_index_access_list",
        "Replace index accesses with constant parameters with optimized constant accesses. Can reduce memory and CPU steps but increases the size of the compiled contract.",
    ),
    (
        "remove_trace",
        "Removes trace calls from the compiled code. This will make debugging harder but reduces contract size.",
    ),
];

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn levels_layer_without_clobbering() {
        assert_eq!(OPT_O0_CONFIG.compress_patterns, Some(false));
        assert_eq!(OPT_O0_CONFIG.remove_trace, None);
        assert_eq!(OPT_O1_CONFIG.compress_patterns, Some(true));
        assert_eq!(OPT_O1_CONFIG.constant_index_access_list, Some(true));
        assert_eq!(OPT_O1_CONFIG.iterative_unfold_patterns, Some(false));
        assert_eq!(OPT_O2_CONFIG.compress_patterns, Some(true));
        assert_eq!(OPT_O3_CONFIG.iterative_unfold_patterns, Some(true));
        assert_eq!(OPT_O3_CONFIG.remove_trace, Some(true));
    }

    #[test]
    fn explicit_settings_survive_level_merge() {
        let explicit = CompilationConfig {
            remove_trace : Some(false),
            ..CompilationConfig::default()
        };
        let merged = OPT_O3_CONFIG.update(&explicit);
        assert_eq!(merged.remove_trace, Some(false));
        assert_eq!(merged.iterative_unfold_patterns, Some(true));
    }

    #[test]
    fn backend_options_ride_along() {
        assert_eq!(OPT_O3_CONFIG.uplc.unique_variable_names, Some(true));
        assert_eq!(OPT_O1_CONFIG.uplc.remove_force_delay, Some(true));
    }

    #[test]
    fn every_helped_option_exists() {
        // the help table names real config fields
        let names : Vec<&str> = CONFIG_HELP.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec![
            "compress_patterns",
            "iterative_unfold_patterns",
            "constant_index_access_list",
            "remove_trace",
        ]);
    }
}
