//! Connector colors, cycled per target.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Swatch {
    pub main: &'static str,
    pub light: &'static str,
}

pub const PALETTE: [Swatch; 6] = [
    Swatch { main: "#6366f1", light: "#818cf8" },
    Swatch { main: "#10b981", light: "#34d399" },
    Swatch { main: "#f59e0b", light: "#fbbf24" },
    Swatch { main: "#ec4899", light: "#f472b6" },
    Swatch { main: "#8b5cf6", light: "#a78bfa" },
    Swatch { main: "#06b6d4", light: "#22d3ee" },
];

pub fn swatch(index: usize) -> Swatch {
    PALETTE[index % PALETTE.len()]
}
