mod common;

use std::collections::BTreeSet;

use mdo_core::{DisciplineKey, MdoError};
use mdo_topology::{
    assemble_topology, topology_hash, BuilderManifest, Child, CouplingGroupType, CouplingShape,
    CouplingSpec, GroupNode, ManifestBuilder, ScenarioKind, SolverStrategy, SubsystemRegistry,
};
use proptest::prelude::*;

fn registry_for(kind: ScenarioKind, pre: bool, post: bool, balance: bool) -> SubsystemRegistry {
    let mut registry = SubsystemRegistry::new();
    for key in kind.disciplines() {
        let manifest = BuilderManifest {
            pre_coupling: pre,
            coupling: if *key == DisciplineKey::Ldxfer {
                CouplingShape::Transfer
            } else {
                CouplingShape::Single
            },
            post_coupling: post,
            post_coupling_for_schur: post,
            number_of_nodes: Some(common::AERO_NODES),
            fail_on: None,
        };
        registry.register(*key, Box::new(ManifestBuilder::new(key.as_str(), manifest)));
    }
    if balance {
        registry = registry.with_balance_group(common::balance("point"));
    }
    registry
}

fn coupling_choice(kind: ScenarioKind, choice: usize) -> CouplingGroupType {
    let singles: Vec<_> = kind
        .disciplines()
        .iter()
        .copied()
        .filter(|key| *key != DisciplineKey::Ldxfer)
        .collect();
    match choice % (singles.len() + 2) {
        0 => CouplingGroupType::FullCoupling,
        1 => CouplingGroupType::NoCoupling,
        n => CouplingGroupType::SingleDisciplineOnly(singles[n - 2]),
    }
}

fn kind_strategy() -> impl Strategy<Value = ScenarioKind> {
    prop::sample::select(ScenarioKind::ALL.to_vec())
}

fn leaf_names(parent: &GroupNode) -> Vec<String> {
    parent
        .children()
        .iter()
        .filter_map(Child::as_leaf)
        .map(|leaf| leaf.name().to_string())
        .collect()
}

fn expected_error(order: &[DisciplineKey], active: &[DisciplineKey]) -> (&'static str, Option<DisciplineKey>) {
    if let Some(foreign) = order.iter().find(|key| !active.contains(key)) {
        return ("order-foreign-entry", Some(*foreign));
    }
    let mut seen = BTreeSet::new();
    for key in order {
        if !seen.insert(*key) {
            return ("order-duplicate-entry", Some(*key));
        }
    }
    ("order-wrong-length", None)
}

proptest! {
    #[test]
    fn permuted_orderings_are_honoured(
        pre in Just(ScenarioKind::AeroStructural.disciplines().to_vec()).prop_shuffle(),
        post in Just(ScenarioKind::AeroStructural.disciplines().to_vec()).prop_shuffle(),
    ) {
        let spec = CouplingSpec::aerostructural()
            .with_pre_coupling_order(pre.clone())
            .with_post_coupling_order(post.clone());
        let mut registry = registry_for(ScenarioKind::AeroStructural, true, true, false);
        let root = assemble_topology(&spec, &mut registry, "point").unwrap();

        let mut expected: Vec<String> = pre.iter().map(|key| format!("{key}_pre")).collect();
        expected.extend(post.iter().map(|key| format!("{key}_post")));
        prop_assert_eq!(leaf_names(&root), expected);
        prop_assert_eq!(root.children()[3].name(), "coupling");
    }

    #[test]
    fn non_permutations_are_rejected_naming_the_entry(
        kind in kind_strategy(),
        order in prop::collection::vec(prop::sample::select(DisciplineKey::ALL.to_vec()), 0..6),
        on_post in any::<bool>(),
    ) {
        let active = kind.disciplines();
        let is_permutation = order.len() == active.len()
            && order.iter().copied().collect::<BTreeSet<_>>() == active.iter().copied().collect();
        prop_assume!(!is_permutation);

        let spec = CouplingSpec::new(active.iter().copied());
        let spec = if on_post {
            spec.with_post_coupling_order(order.clone())
        } else {
            spec.with_pre_coupling_order(order.clone())
        };
        let mut registry = SubsystemRegistry::new();
        let err = assemble_topology(&spec, &mut registry, "point").unwrap_err();

        let (code, entry) = expected_error(&order, active);
        prop_assert!(err.is_config());
        prop_assert_eq!(err.info().code.as_str(), code);
        if let Some(entry) = entry {
            prop_assert_eq!(err.info().context.get("entry").map(String::as_str), Some(entry.as_str()));
        }
        let field = if on_post { "post_coupling_order" } else { "pre_coupling_order" };
        prop_assert_eq!(err.info().context.get("field").map(String::as_str), Some(field));
        prop_assert!(registry.issued().is_empty());
    }

    #[test]
    fn leaf_count_matches_issued_handles(
        kind in kind_strategy(),
        choice in 0usize..8,
        pre in any::<bool>(),
        post in any::<bool>(),
        balance in any::<bool>(),
    ) {
        let spec = CouplingSpec::new(kind.disciplines().iter().copied())
            .with_coupling_group_type(coupling_choice(kind, choice))
            .with_balance_group(balance);
        let mut registry = registry_for(kind, pre, post, balance);
        let root = assemble_topology(&spec, &mut registry, "point").unwrap();

        prop_assert_eq!(root.leaf_count(), registry.issued().len());
        let mut labels: Vec<_> = root.leaves().into_iter().map(|(_, leaf)| leaf.handle().label().to_string()).collect();
        let mut issued: Vec<_> = registry.issued().iter().map(|record| record.label.clone()).collect();
        labels.sort();
        issued.sort();
        prop_assert_eq!(labels, issued);
    }

    #[test]
    fn strategies_follow_the_shape(
        kind in kind_strategy(),
        choice in 0usize..8,
        balance in any::<bool>(),
    ) {
        let coupling = coupling_choice(kind, choice);
        let spec = CouplingSpec::new(kind.disciplines().iter().copied())
            .with_coupling_group_type(coupling)
            .with_balance_group(balance);
        let mut registry = registry_for(kind, true, true, balance);
        let root = assemble_topology(&spec, &mut registry, "point").unwrap();

        let bgs = root.count_strategies(|s| matches!(s, SolverStrategy::BlockGaussSeidel { .. }));
        let schur = root.count_strategies(|s| matches!(s, SolverStrategy::SchurElimination { .. }));
        if coupling == CouplingGroupType::FullCoupling {
            prop_assert_eq!(bgs, 1);
        } else {
            prop_assert_eq!(bgs, 0);
        }

        if balance {
            prop_assert_eq!(schur, 1);
            let (path, node) = root
                .descendants()
                .into_iter()
                .find(|(_, node)| matches!(node.strategy(), Some(SolverStrategy::SchurElimination { .. })))
                .unwrap();
            prop_assert_eq!(path.as_str(), kind.schur_node_name());
            if let Some(SolverStrategy::SchurElimination { partition_names, .. }) = node.strategy() {
                prop_assert_eq!(partition_names, &["coupling_group", "balance_group"]);
            }
            let inner = node.find_group("coupling_group").unwrap();
            prop_assert_eq!(inner.strategy(), Some(&SolverStrategy::RunOnce));
            prop_assert!(root.strategy().is_none());
        } else {
            prop_assert_eq!(schur, 0);
            let run_once_root = root.strategy() == Some(&SolverStrategy::RunOnce);
            prop_assert_eq!(run_once_root, bgs == 0);
        }
    }

    #[test]
    fn assembly_is_idempotent(
        kind in kind_strategy(),
        choice in 0usize..8,
        balance in any::<bool>(),
    ) {
        let spec = CouplingSpec::new(kind.disciplines().iter().copied())
            .with_coupling_group_type(coupling_choice(kind, choice))
            .with_balance_group(balance);
        let mut first_registry = registry_for(kind, true, true, balance);
        let mut second_registry = registry_for(kind, true, true, balance);
        let first = assemble_topology(&spec, &mut first_registry, "point").unwrap();
        let second = assemble_topology(&spec, &mut second_registry, "point").unwrap();
        let again = assemble_topology(&spec, &mut first_registry, "point").unwrap();

        prop_assert_eq!(first.outline(), second.outline());
        prop_assert_eq!(first.outline(), again.outline());
        prop_assert_eq!(topology_hash(&first).unwrap(), topology_hash(&again).unwrap());
    }
}

#[test]
fn duplicate_entries_name_the_repeated_discipline() {
    let spec = CouplingSpec::aerostructural().with_pre_coupling_order([
        DisciplineKey::Aero,
        DisciplineKey::Aero,
        DisciplineKey::Struct,
    ]);
    match spec.validate() {
        Err(MdoError::Config(info)) => {
            assert_eq!(info.code, "order-duplicate-entry");
            assert_eq!(info.context["entry"], "aero");
            assert_eq!(info.context["valid"], "aero, struct, ldxfer");
        }
        other => panic!("expected configuration error, found {other:?}"),
    }
}
