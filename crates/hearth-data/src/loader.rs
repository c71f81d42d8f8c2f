//! Resolution pipeline: reads data files, resolves cross-references, builds
//! the registry and the tuning config.
//!
//! A data pack is a directory of named files (`items`, `fuels`, ...), each
//! in RON, TOML or JSON. [`DataFile`] finds and parses one of them;
//! [`load_game_data`] reads the whole pack.

use hearth_core::config::HearthConfig;
use hearth_core::registry::{Registry, RegistryBuilder, RegistryError};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

use crate::resolve::{NameTables, resolve_fuel, resolve_recipe};
use crate::schema::*;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The resolved definitions failed registry validation.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Data files
// ===========================================================================

/// Supported data file formats, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    const ALL: [Format; 3] = [Format::Ron, Format::Toml, Format::Json];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Ron => "ron",
            Format::Toml => "toml",
            Format::Json => "json",
        }
    }

    /// The format of `path`, judged by its extension.
    pub fn of(path: &Path) -> Result<Format, DataLoadError> {
        let ext = path.extension().and_then(|e| e.to_str());
        Self::ALL
            .into_iter()
            .find(|f| Some(f.extension()) == ext)
            .ok_or_else(|| DataLoadError::UnsupportedFormat {
                file: path.to_path_buf(),
            })
    }

    fn parse<T: DeserializeOwned>(self, text: &str) -> Result<T, String> {
        match self {
            Format::Ron => ron::from_str(text).map_err(|e| e.to_string()),
            Format::Toml => toml::from_str(text).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        }
    }
}

/// One file of a data pack, e.g. `fuels.ron`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    pub path: PathBuf,
    pub format: Format,
}

impl DataFile {
    /// Open `path`, rejecting extensions we cannot parse.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, DataLoadError> {
        let path = path.into();
        let format = Format::of(&path)?;
        Ok(Self { path, format })
    }

    /// Look for `{stem}.ron`, `{stem}.toml` or `{stem}.json` in `dir`.
    /// At most one of them may exist.
    pub fn find(dir: &Path, stem: &str) -> Result<Option<Self>, DataLoadError> {
        let mut present = Format::ALL
            .into_iter()
            .map(|format| Self {
                path: dir.join(format!("{stem}.{}", format.extension())),
                format,
            })
            .filter(|f| f.path.exists());
        let first = present.next();
        if let (Some(a), Some(b)) = (&first, present.next()) {
            return Err(DataLoadError::ConflictingFormats {
                a: a.path.clone(),
                b: b.path,
            });
        }
        Ok(first)
    }

    pub fn require(dir: &Path, stem: &str) -> Result<Self, DataLoadError> {
        Self::find(dir, stem)?.ok_or_else(|| DataLoadError::MissingRequired {
            file: stem.to_string(),
            dir: dir.to_path_buf(),
        })
    }

    /// Deserialize the whole file as one `T`.
    pub fn read<T: DeserializeOwned>(&self) -> Result<T, DataLoadError> {
        let text = std::fs::read_to_string(&self.path)?;
        self.format.parse(&text).map_err(|detail| self.parse_error(detail))
    }

    /// Deserialize a list of definitions. TOML has no top-level arrays, so
    /// a TOML list sits under a key named after the file: `[[fuels]]` in
    /// `fuels.toml`.
    pub fn read_list<T: DeserializeOwned>(&self) -> Result<Vec<T>, DataLoadError> {
        if self.format != Format::Toml {
            return self.read();
        }
        let key = self.path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        let mut tables: HashMap<String, Vec<T>> = self.read()?;
        tables
            .remove(key)
            .ok_or_else(|| self.parse_error(format!("no [[{key}]] entries")))
    }

    fn parse_error(&self, detail: String) -> DataLoadError {
        DataLoadError::Parse {
            file: self.path.clone(),
            detail,
        }
    }
}

/// Enter a newly defined name, building its value with `define`. A name
/// may be defined only once.
fn define_once<V>(
    table: &mut HashMap<String, V>,
    name: String,
    file: &DataFile,
    define: impl FnOnce(&str) -> V,
) -> Result<(), DataLoadError> {
    match table.entry(name) {
        Entry::Occupied(taken) => Err(DataLoadError::DuplicateName {
            file: file.path.clone(),
            name: taken.key().clone(),
        }),
        Entry::Vacant(slot) => {
            let value = define(slot.key());
            slot.insert(value);
            Ok(())
        }
    }
}

// ===========================================================================
// Pipeline
// ===========================================================================

/// Everything a world needs from the data directory.
#[derive(Debug)]
pub struct GameData {
    pub registry: Registry,
    pub config: HearthConfig,
}

/// Load every data file in `dir` into a frozen registry and a config.
///
/// `items` is required. `fluids`, `traits`, `fuels`, `barrel_recipes` and
/// `config` are optional; a missing config means default tuning. Each file
/// may be RON, TOML or JSON. Recipes keep their file order, which is their
/// match priority.
pub fn load_game_data(dir: &Path) -> Result<GameData, DataLoadError> {
    let mut builder = RegistryBuilder::new();
    let mut names = NameTables::default();

    let file = DataFile::require(dir, "items")?;
    for item in file.read_list::<ItemData>()? {
        let max_stack = item.max_stack;
        define_once(&mut names.items, item.name, &file, |name| {
            builder.register_item(name, max_stack)
        })?;
    }

    if let Some(file) = DataFile::find(dir, "fluids")? {
        for fluid in file.read_list::<FluidData>()? {
            define_once(&mut names.fluids, fluid.name, &file, |name| {
                builder.register_fluid(name)
            })?;
        }
    }

    if let Some(file) = DataFile::find(dir, "traits")? {
        for t in file.read_list::<TraitData>()? {
            define_once(&mut names.traits, t.name, &file, |name| {
                builder.register_trait(name)
            })?;
        }
    }

    let mut fuels = HashMap::new();
    if let Some(file) = DataFile::find(dir, "fuels")? {
        for fuel in file.read_list::<FuelData>()? {
            let def = resolve_fuel(&fuel, &file.path, &names)?;
            define_once(&mut fuels, fuel.name, &file, |_| builder.register_fuel(def))?;
        }
    }

    let mut recipes = HashMap::new();
    if let Some(file) = DataFile::find(dir, "barrel_recipes")? {
        for recipe in file.read_list::<BarrelRecipeData>()? {
            let sealed = resolve_recipe(&recipe, &file.path, &names)?;
            define_once(&mut recipes, recipe.name, &file, |_| {
                builder.register_sealed_recipe(sealed)
            })?;
        }
    }

    let config = match DataFile::find(dir, "config")? {
        Some(file) => file.read::<HearthConfig>()?,
        None => HearthConfig::default(),
    };

    let registry = builder.build()?;
    tracing::debug!(
        dir = %dir.display(),
        items = names.items.len(),
        fluids = names.fluids.len(),
        traits = names.traits.len(),
        fuels = fuels.len(),
        recipes = recipes.len(),
        "game data loaded"
    );
    Ok(GameData { registry, config })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// A fresh, empty temp directory unique to this test and process.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "hearth_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    // -----------------------------------------------------------------------
    // Format detection and discovery
    // -----------------------------------------------------------------------

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::of(Path::new("fuels.ron")).unwrap(), Format::Ron);
        assert_eq!(Format::of(Path::new("fuels.toml")).unwrap(), Format::Toml);
        assert_eq!(Format::of(Path::new("fuels.json")).unwrap(), Format::Json);
        for bad in ["fuels.yaml", "fuels"] {
            assert!(matches!(
                DataFile::new(bad),
                Err(DataLoadError::UnsupportedFormat { .. })
            ));
        }
    }

    #[test]
    fn find_picks_the_one_format() {
        let dir = make_test_dir("find_one");
        assert_eq!(DataFile::find(&dir, "fluids").unwrap(), None);
        fs::write(dir.join("fluids.toml"), "").unwrap();
        let file = DataFile::find(&dir, "fluids").unwrap().unwrap();
        assert_eq!(file.path, dir.join("fluids.toml"));
        assert_eq!(file.format, Format::Toml);
        cleanup(&dir);
    }

    #[test]
    fn find_rejects_two_formats() {
        let dir = make_test_dir("find_conflict");
        fs::write(dir.join("items.ron"), "[]").unwrap();
        fs::write(dir.join("items.json"), "[]").unwrap();
        assert!(matches!(
            DataFile::find(&dir, "items"),
            Err(DataLoadError::ConflictingFormats { .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn require_reports_the_missing_stem() {
        let dir = make_test_dir("require_missing");
        assert!(matches!(
            DataFile::require(&dir, "items"),
            Err(DataLoadError::MissingRequired { ref file, .. }) if file == "items"
        ));
        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    #[test]
    fn lists_read_in_every_format() {
        let dir = make_test_dir("list_formats");
        fs::write(dir.join("fluids.ron"), r#"[(name: "brine"), (name: "vinegar")]"#).unwrap();
        fs::write(dir.join("fluids.json"), r#"[{"name": "brine"}, {"name": "vinegar"}]"#).unwrap();
        fs::write(
            dir.join("fluids.toml"),
            r#"
[[fluids]]
name = "brine"

[[fluids]]
name = "vinegar"
"#,
        )
        .unwrap();

        for ext in ["ron", "json", "toml"] {
            let file = DataFile::new(dir.join(format!("fluids.{ext}"))).unwrap();
            let fluids: Vec<FluidData> = file.read_list().unwrap();
            assert_eq!(fluids.len(), 2, "{ext}");
            assert_eq!(fluids[1].name, "vinegar");
        }
        cleanup(&dir);
    }

    #[test]
    fn toml_list_must_match_the_file_name() {
        let dir = make_test_dir("list_toml_key");
        let path = dir.join("fluids.toml");
        fs::write(&path, "[[liquids]]\nname = \"brine\"\n").unwrap();
        let result: Result<Vec<FluidData>, _> = DataFile::new(&path).unwrap().read_list();
        assert!(matches!(
            result,
            Err(DataLoadError::Parse { ref detail, .. }) if detail.contains("[[fluids]]")
        ));
        cleanup(&dir);
    }

    #[test]
    fn read_reports_parse_errors() {
        let dir = make_test_dir("deser_parse_err");
        let path = dir.join("config.ron");
        fs::write(&path, "(firepit: {{{").unwrap();
        let result: Result<HearthConfig, _> = DataFile::new(&path).unwrap().read();
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));
        cleanup(&dir);
    }

    #[test]
    fn names_are_defined_once() {
        let file = DataFile::new("items.ron").unwrap();
        let mut table = HashMap::new();
        define_once(&mut table, "charcoal".into(), &file, |name| name.len()).unwrap();
        assert_eq!(table["charcoal"], 8);
        assert!(matches!(
            define_once(&mut table, "charcoal".into(), &file, |_| 0),
            Err(DataLoadError::DuplicateName { ref name, .. }) if name == "charcoal"
        ));
        assert_eq!(table["charcoal"], 8);
    }

    #[test]
    fn error_messages_name_the_file() {
        let e = DataLoadError::MissingRequired {
            file: "items".into(),
            dir: PathBuf::from("/data"),
        };
        assert!(format!("{e}").contains("items"));
        assert!(format!("{e}").contains("/data"));

        let e = DataLoadError::UnresolvedRef {
            file: PathBuf::from("barrel_recipes.ron"),
            name: "brined".to_string(),
            expected_kind: "trait",
        };
        let msg = format!("{e}");
        assert!(msg.contains("brined"));
        assert!(msg.contains("trait"));
        assert!(msg.contains("barrel_recipes.ron"));

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let data_err: DataLoadError = io_err.into();
        assert!(matches!(data_err, DataLoadError::Io(_)));
    }

    // -----------------------------------------------------------------------
    // load_game_data
    // -----------------------------------------------------------------------

    #[test]
    fn items_only_directory_loads_with_defaults() {
        let dir = make_test_dir("items_only");
        fs::write(dir.join("items.json"), r#"[{"name": "log", "max_stack": 16}]"#).unwrap();

        let data = load_game_data(&dir).unwrap();
        assert_eq!(data.registry.item_count(), 1);
        assert_eq!(data.registry.recipe_count(), 0);
        assert_eq!(data.config, HearthConfig::default());
        cleanup(&dir);
    }

    #[test]
    fn missing_items_is_an_error() {
        let dir = make_test_dir("no_items");
        fs::write(dir.join("fluids.ron"), r#"[(name: "brine")]"#).unwrap();
        assert!(matches!(
            load_game_data(&dir),
            Err(DataLoadError::MissingRequired { .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn duplicate_item_names_are_rejected() {
        let dir = make_test_dir("dup_items");
        fs::write(dir.join("items.ron"), r#"[(name: "log"), (name: "log")]"#).unwrap();
        assert!(matches!(
            load_game_data(&dir),
            Err(DataLoadError::DuplicateName { ref name, .. }) if name == "log"
        ));
        cleanup(&dir);
    }

    #[test]
    fn fuel_with_unknown_item_is_unresolved() {
        let dir = make_test_dir("fuel_unknown_item");
        fs::write(dir.join("items.ron"), r#"[(name: "log")]"#).unwrap();
        fs::write(
            dir.join("fuels.ron"),
            r#"[(name: "peat", item: Some("peat"), burn_duration: 2200, burn_temperature: 680.0)]"#,
        )
        .unwrap();
        assert!(matches!(
            load_game_data(&dir),
            Err(DataLoadError::UnresolvedRef { expected_kind: "item", .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn invalid_fuel_fails_registry_validation() {
        let dir = make_test_dir("fuel_invalid");
        fs::write(dir.join("items.ron"), r#"[(name: "log")]"#).unwrap();
        fs::write(
            dir.join("fuels.ron"),
            r#"[(name: "wet_log", item: Some("log"), burn_duration: 0, burn_temperature: 300.0)]"#,
        )
        .unwrap();
        assert!(matches!(load_game_data(&dir), Err(DataLoadError::Registry(_))));
        cleanup(&dir);
    }

    #[test]
    fn endless_recipe_fails_registry_validation() {
        let dir = make_test_dir("recipe_endless");
        fs::write(dir.join("items.ron"), r#"[(name: "log")]"#).unwrap();
        fs::write(dir.join("fluids.ron"), r#"[(name: "brine")]"#).unwrap();
        fs::write(
            dir.join("barrel_recipes.ron"),
            r#"[(name: "steeping", input_fluid: Some((fluid: "brine", amount: 100)), duration: (hours: 1e16))]"#,
        )
        .unwrap();
        let err = load_game_data(&dir).unwrap_err();
        assert!(matches!(err, DataLoadError::Registry(_)));
        assert!(err.to_string().contains("too long"), "got: {err}");
        cleanup(&dir);
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let dir = make_test_dir("partial_config");
        fs::write(dir.join("items.ron"), r#"[(name: "log")]"#).unwrap();
        fs::write(
            dir.join("config.toml"),
            r#"
[firepit]
smoke_interval = 40

[crucible]
stability_ticks = 12
"#,
        )
        .unwrap();
        let config = load_game_data(&dir).unwrap().config;
        assert_eq!(config.firepit.smoke_interval, 40);
        assert_eq!(config.crucible.stability_ticks, 12);
        assert_eq!(config.firepit.heater.fuel_slots, 4);
        assert_eq!(config.forge, HearthConfig::default().forge);
        cleanup(&dir);
    }
}
