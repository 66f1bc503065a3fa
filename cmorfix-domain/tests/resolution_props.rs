use cmorfix_domain::{Fix, FixRegistry, NoopFix};
use cmorfix_types::normalize;
use proptest::prelude::*;

fn token() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9_-]{0,12}"
}

fn noop() -> anyhow::Result<Box<dyn Fix>> {
    Ok(Box::new(NoopFix))
}

proptest! {
    #[test]
    fn hyphen_and_underscore_spellings_resolve_alike(
        project in token(),
        model in token(),
        variable in token(),
    ) {
        let mut registry = FixRegistry::new();
        registry.register(&project, &model, &variable, noop).unwrap();

        let underscored = |s: &str| normalize(s);
        let hyphenated = |s: &str| s.replace('_', "-");

        prop_assert!(registry.resolve(&project, &model, &variable).is_found());
        prop_assert!(registry
            .resolve(&underscored(&project), &underscored(&model), &underscored(&variable))
            .is_found());
        prop_assert!(registry
            .resolve(&hyphenated(&project), &hyphenated(&model), &hyphenated(&variable))
            .is_found());
    }

    #[test]
    fn empty_registry_never_finds_anything(
        project in ".*",
        model in ".*",
        variable in ".*",
    ) {
        let registry = FixRegistry::new();
        prop_assert!(registry.resolve(&project, &model, &variable).is_absent());
    }

    #[test]
    fn absent_resolution_means_identity_stages(
        model in prop::sample::select(vec!["FGOALS-g2", "FGOALS-s2", "CanESM2", "CESM2"]),
        variable in "[a-z]{1,8}",
    ) {
        let registry = FixRegistry::builtin();
        let absent = registry.resolve("CMIP5", model, &variable).is_absent();
        let fix = registry.resolve_fix("CMIP5", model, &variable);
        prop_assert_eq!(absent, fix.is_identity());
    }

    #[test]
    fn unrelated_variable_stays_absent(
        variable in "[a-z]{1,8}",
    ) {
        prop_assume!(variable != "fgco2");
        let registry = FixRegistry::builtin();
        prop_assert!(registry.resolve("CMIP5", "CanESM2", &variable).is_absent());
    }
}
