//! Reagent, solvent and condition vocabulary.
//!
//! Tags carried into claim payloads:
//! - `water-reactive`: decomposes in water or protic media
//! - `protic`: solvent with an exchangeable proton
//! - `inert` / `air`: atmosphere quality
//! - `dry` / `wet`: moisture condition

use crate::domain::ReagentRole;

pub const TAG_WATER_REACTIVE: &str = "water-reactive";
pub const TAG_PROTIC: &str = "protic";
pub const TAG_INERT: &str = "inert";
pub const TAG_AIR: &str = "air";
pub const TAG_DRY: &str = "dry";
pub const TAG_WET: &str = "wet";

/// One recognized term
#[derive(Debug)]
pub struct LexiconEntry {
    /// Surface form to match
    pub term: &'static str,
    /// Canonical name used as the normalized value
    pub canonical: &'static str,
    pub role: ReagentRole,
    pub tags: &'static [&'static str],
    /// Match ignoring case (words); formulas and abbreviations are exact
    pub ignore_case: bool,
}

const fn entry(
    term: &'static str,
    canonical: &'static str,
    role: ReagentRole,
    tags: &'static [&'static str],
    ignore_case: bool,
) -> LexiconEntry {
    LexiconEntry {
        term,
        canonical,
        role,
        tags,
        ignore_case,
    }
}

use ReagentRole::{Atmosphere, Dryness, Quench, Reagent, Solvent};

const WR: &[&str] = &[TAG_WATER_REACTIVE];
const PROTIC: &[&str] = &[TAG_PROTIC];
const INERT: &[&str] = &[TAG_INERT];
const AIR: &[&str] = &[TAG_AIR];
const DRY: &[&str] = &[TAG_DRY];
const WET: &[&str] = &[TAG_WET];
const NONE: &[&str] = &[];

pub static LEXICON: &[LexiconEntry] = &[
    // Organometallics, hydrides and strong bases
    entry("n-BuLi", "n-BuLi", Reagent, WR, false),
    entry("t-BuLi", "t-BuLi", Reagent, WR, false),
    entry("s-BuLi", "s-BuLi", Reagent, WR, false),
    entry("BuLi", "n-BuLi", Reagent, WR, false),
    entry("butyllithium", "n-BuLi", Reagent, WR, true),
    entry("LDA", "LDA", Reagent, WR, false),
    entry("LiHMDS", "LiHMDS", Reagent, WR, false),
    entry("NaHMDS", "NaHMDS", Reagent, WR, false),
    entry("KHMDS", "KHMDS", Reagent, WR, false),
    entry("NaH", "NaH", Reagent, WR, false),
    entry("sodium hydride", "NaH", Reagent, WR, true),
    entry("LiAlH4", "LiAlH4", Reagent, WR, false),
    entry("LAH", "LiAlH4", Reagent, WR, false),
    entry("lithium aluminium hydride", "LiAlH4", Reagent, WR, true),
    entry("lithium aluminum hydride", "LiAlH4", Reagent, WR, true),
    entry("DIBAL-H", "DIBAL-H", Reagent, WR, false),
    entry("DIBAL", "DIBAL-H", Reagent, WR, false),
    entry("MeMgBr", "MeMgBr", Reagent, WR, false),
    entry("EtMgBr", "EtMgBr", Reagent, WR, false),
    entry("PhMgBr", "PhMgBr", Reagent, WR, false),
    entry("Grignard reagent", "Grignard reagent", Reagent, WR, true),
    // Water-sensitive electrophiles and Lewis acids
    entry("SOCl2", "SOCl2", Reagent, WR, false),
    entry("thionyl chloride", "SOCl2", Reagent, WR, true),
    entry("oxalyl chloride", "(COCl)2", Reagent, WR, true),
    entry("AlCl3", "AlCl3", Reagent, WR, false),
    entry("TiCl4", "TiCl4", Reagent, WR, false),
    entry("BBr3", "BBr3", Reagent, WR, false),
    entry("TMSCl", "TMSCl", Reagent, WR, false),
    entry("TMSOTf", "TMSOTf", Reagent, WR, false),
    entry("Tf2O", "Tf2O", Reagent, WR, false),
    // Bench-stable reagents
    entry("NaBH4", "NaBH4", Reagent, NONE, false),
    entry("NaBH3CN", "NaBH3CN", Reagent, NONE, false),
    entry("K2CO3", "K2CO3", Reagent, NONE, false),
    entry("Cs2CO3", "Cs2CO3", Reagent, NONE, false),
    entry("NaOH", "NaOH", Reagent, NONE, false),
    entry("KOH", "KOH", Reagent, NONE, false),
    entry("LiOH", "LiOH", Reagent, NONE, false),
    entry("Et3N", "Et3N", Reagent, NONE, false),
    entry("triethylamine", "Et3N", Reagent, NONE, true),
    entry("DIPEA", "DIPEA", Reagent, NONE, false),
    entry("DMAP", "DMAP", Reagent, NONE, false),
    entry("HCl", "HCl", Reagent, NONE, false),
    entry("H2SO4", "H2SO4", Reagent, NONE, false),
    entry("TFA", "TFA", Reagent, NONE, false),
    entry("AcOH", "AcOH", Reagent, NONE, false),
    entry("mCPBA", "mCPBA", Reagent, NONE, false),
    entry("m-CPBA", "mCPBA", Reagent, NONE, false),
    entry("DCC", "DCC", Reagent, NONE, false),
    entry("EDC", "EDC", Reagent, NONE, false),
    entry("HATU", "HATU", Reagent, NONE, false),
    entry("Pd(PPh3)4", "Pd(PPh3)4", Reagent, NONE, false),
    entry("Pd(OAc)2", "Pd(OAc)2", Reagent, NONE, false),
    entry("Pd/C", "Pd/C", Reagent, NONE, false),
    // Solvents
    entry("THF", "THF", Solvent, NONE, false),
    entry("tetrahydrofuran", "THF", Solvent, NONE, true),
    entry("DCM", "DCM", Solvent, NONE, false),
    entry("CH2Cl2", "DCM", Solvent, NONE, false),
    entry("dichloromethane", "DCM", Solvent, NONE, true),
    entry("DMF", "DMF", Solvent, NONE, false),
    entry("DMSO", "DMSO", Solvent, NONE, false),
    entry("toluene", "toluene", Solvent, NONE, true),
    entry("hexanes", "hexane", Solvent, NONE, true),
    entry("hexane", "hexane", Solvent, NONE, true),
    entry("EtOAc", "EtOAc", Solvent, NONE, false),
    entry("ethyl acetate", "EtOAc", Solvent, NONE, true),
    entry("MeCN", "MeCN", Solvent, NONE, false),
    entry("CH3CN", "MeCN", Solvent, NONE, false),
    entry("acetonitrile", "MeCN", Solvent, NONE, true),
    entry("Et2O", "Et2O", Solvent, NONE, false),
    entry("diethyl ether", "Et2O", Solvent, NONE, true),
    entry("1,4-dioxane", "dioxane", Solvent, NONE, true),
    entry("dioxane", "dioxane", Solvent, NONE, true),
    entry("acetone", "acetone", Solvent, NONE, true),
    entry("CHCl3", "CHCl3", Solvent, NONE, false),
    entry("chloroform", "CHCl3", Solvent, NONE, true),
    entry("benzene", "benzene", Solvent, NONE, true),
    entry("MeOH", "MeOH", Solvent, PROTIC, false),
    entry("methanol", "MeOH", Solvent, PROTIC, true),
    entry("EtOH", "EtOH", Solvent, PROTIC, false),
    entry("ethanol", "EtOH", Solvent, PROTIC, true),
    entry("iPrOH", "iPrOH", Solvent, PROTIC, false),
    entry("isopropanol", "iPrOH", Solvent, PROTIC, true),
    entry("H2O", "H2O", Solvent, PROTIC, false),
    entry("water", "H2O", Solvent, PROTIC, true),
    // Atmosphere
    entry("inert atmosphere", "inert", Atmosphere, INERT, true),
    entry("nitrogen", "N2", Atmosphere, INERT, true),
    entry("N2", "N2", Atmosphere, INERT, false),
    entry("argon", "Ar", Atmosphere, INERT, true),
    entry("Ar", "Ar", Atmosphere, INERT, false),
    entry("under air", "air", Atmosphere, AIR, true),
    entry("open to air", "air", Atmosphere, AIR, true),
    entry("open to the air", "air", Atmosphere, AIR, true),
    entry("ambient atmosphere", "air", Atmosphere, AIR, true),
    // Moisture
    entry("anhydrous", "anhydrous", Dryness, DRY, true),
    entry("dry", "anhydrous", Dryness, DRY, true),
    entry("flame-dried", "flame-dried", Dryness, DRY, true),
    entry("oven-dried", "oven-dried", Dryness, DRY, true),
    entry("molecular sieves", "molecular sieves", Dryness, DRY, true),
    entry("aqueous", "aqueous", Dryness, WET, true),
    entry("wet", "wet", Dryness, WET, true),
    // Quench events
    entry("quench", "quench", Quench, NONE, true),
    entry("quenched", "quench", Quench, NONE, true),
    entry("quenching", "quench", Quench, NONE, true),
];
