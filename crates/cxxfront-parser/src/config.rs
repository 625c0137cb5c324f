//! Compilation-time options.
//!
//! These are the knobs the driver may set before handing a token stream to
//! the parser. They affect type sizes, struct layout, and name mangling;
//! nothing else reads them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ManglingStyle {
    Msvc,
    #[default]
    Itanium,
}

/// LP64: `long` is 64-bit (Unix-like). LLP64: `long` stays 32-bit (Windows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LongModel {
    #[default]
    Lp64,
    Llp64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOptions {
    pub mangling_style: ManglingStyle,
    /// 32 or 64; drives `sizeof(void*)` and `wchar_t` width.
    pub target_pointer_bits: u32,
    pub target_long_model: LongModel,
    /// Default struct alignment (bytes) when no `#pragma pack` is active.
    pub default_pack: u32,
    /// Raise a debugger trap when the cursor reaches this line (debug builds).
    pub debug_break_line: Option<u32>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            mangling_style: ManglingStyle::Itanium,
            target_pointer_bits: 64,
            target_long_model: LongModel::Lp64,
            default_pack: 8,
            debug_break_line: None,
        }
    }
}

impl CompileOptions {
    pub fn pointer_bits(&self) -> u32 {
        self.target_pointer_bits
    }

    pub fn long_bits(&self) -> u32 {
        match self.target_long_model {
            LongModel::Lp64 if self.target_pointer_bits == 64 => 64,
            _ => 32,
        }
    }

    pub fn wchar_bits(&self) -> u32 {
        match self.mangling_style {
            ManglingStyle::Msvc => 16,
            ManglingStyle::Itanium => 32,
        }
    }
}
