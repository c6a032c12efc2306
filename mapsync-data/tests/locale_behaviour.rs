//! Behavioural tests for the locale dictionaries shipped with the repository.

use std::cell::RefCell;

use camino::Utf8PathBuf;
use mapsync_core::{LocaleCatalog, LocaleError, LocaleResolver};
use mapsync_data::{LocaleLoadError, load_locale_catalog};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

#[derive(Default)]
struct LocaleWorld {
    dir: RefCell<Option<Utf8PathBuf>>,
    result: RefCell<Option<Result<LocaleCatalog, LocaleLoadError>>>,
}

#[fixture]
fn world() -> LocaleWorld {
    LocaleWorld::default()
}

impl LocaleWorld {
    fn load(&self, language: &str) {
        let dir = self.dir.borrow().clone().expect("locale directory set");
        self.result
            .replace(Some(load_locale_catalog(&dir, language)));
    }

    fn footer_for(&self, language: &str) -> String {
        let result = self.result.borrow();
        let catalog = result
            .as_ref()
            .expect("catalogue loaded")
            .as_ref()
            .expect("catalogue valid");
        catalog.resolve(Some(language)).note.footer.clone()
    }
}

#[given("the shipped locale directory")]
fn given_shipped_locales(world: &LocaleWorld) {
    let dir = Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../locales");
    world.dir.replace(Some(dir));
}

#[when("the catalogue is loaded with default language \"fr\"")]
fn when_loaded_fr(world: &LocaleWorld) {
    world.load("fr");
}

#[when("the catalogue is loaded with default language \"pt\"")]
fn when_loaded_pt(world: &LocaleWorld) {
    world.load("pt");
}

#[then("the dictionary for \"en-GB\" uses the English footer")]
fn then_english(world: &LocaleWorld) {
    assert!(world.footer_for("en-GB").starts_with("Note sent automatically"));
}

#[then("the dictionary for \"de\" uses the French footer")]
fn then_french(world: &LocaleWorld) {
    assert!(world.footer_for("de").starts_with("Note envoyée automatiquement"));
}

#[then("loading fails because the default language is missing")]
fn then_missing_default(world: &LocaleWorld) {
    let result = world.result.borrow();
    match result.as_ref().expect("catalogue loaded") {
        Err(LocaleLoadError::Catalog(LocaleError::MissingDefault { language })) => {
            assert_eq!(language, "pt");
        }
        other => panic!("expected missing default, got {other:?}"),
    }
}

#[scenario(path = "tests/features/locales.feature", index = 0)]
fn regional_codes_fall_back(world: LocaleWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/locales.feature", index = 1)]
fn missing_default_fails(world: LocaleWorld) {
    let _ = world;
}
