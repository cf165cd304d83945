use indoc::indoc;

use crate::adapters::{SchemaArtifacts, aliases, subtypes, types};
use crate::field::FieldKind;
use crate::graph::{LinkType, SchemaGraph, SkipRootKey};
use crate::provider::MemoryFiles;

fn build(sources: &[(&str, &str)]) -> SchemaGraph {
    let (graph, diagnostics) = SchemaGraph::build(sources.iter().copied());
    assert!(
        diagnostics.is_empty(),
        "schema fixtures should be clean: {diagnostics:?}"
    );
    graph
}

const TECH_RULES: &str = indoc! {r#"
    types = {
        type[technology] = {
            path = "game/common/technologies"
            subtype[land] = {
                category = land_tech
            }
            subtype[naval] = {
                category = naval_tech
            }
            localisation = {
                ## required
                name = "$"
                description = "$_desc"
            }
            modifiers = {
                $_cost_factor = country
            }
        }
    }

    technology = {
        ## cardinality = 1..1
        start_year = int
        category = enum[tech_category]
    }

    enums = {
        enum[tech_category] = { land_tech naval_tech }
    }
"#};

#[test]
fn types_and_rules() {
    let graph = build(&[("technologies.cwt", TECH_RULES)]);

    let tech = &graph.types["technology"];
    assert_eq!(tech.path, vec!["common/technologies"]);
    assert_eq!(tech.subtypes.len(), 2);
    assert_eq!(tech.subtypes[0].name, "land");

    assert_eq!(tech.localisation.len(), 2);
    assert!(tech.localisation[0].required);
    assert_eq!(tech.localisation[1].pattern, "$_desc");

    assert_eq!(tech.modifiers.len(), 1);
    assert_eq!(tech.modifiers[0].pattern, "$_cost_factor");

    let rules = &graph.type_rules["technology"];
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].key, "start_year");

    assert_eq!(
        graph.enums["tech_category"].members,
        vec!["land_tech", "naval_tech"]
    );
}

#[test]
fn type_options() {
    let graph = build(&[(
        "events.cwt",
        indoc! {r#"
            types = {
                type[event] = {
                    path = "game/events"
                    name_field = id
                    skip_root_key = namespace
                    unique = yes
                    path_extension = .txt
                }
            }
        "#},
    )]);

    let event = &graph.types["event"];
    assert_eq!(event.name_field.as_deref(), Some("id"));
    assert!(event.unique);
    assert_eq!(event.path_extension.as_deref(), Some(".txt"));
    assert_eq!(
        event.skip_root_key,
        Some(SkipRootKey::Specific(vec!["namespace".to_string()]))
    );
}

#[test]
fn aliases_and_single_aliases() {
    let graph = build(&[(
        "triggers.cwt",
        indoc! {r#"
            alias[trigger:always] = bool
            alias[trigger:tag] = scalar
            alias[trigger:and] = single_alias_right[trigger_clause]

            single_alias[trigger_clause] = {
                alias_name[trigger] = alias_match_left[trigger]
            }
        "#},
    )]);

    let members = aliases::family_members(&graph, "trigger");
    assert_eq!(members.len(), 3);
    assert_eq!(members[0].name, "always");

    // `and` resolves through the single alias to the clause body.
    let and = &members[2].statement;
    let body = aliases::effective_block(&graph, and).unwrap();
    assert_eq!(body.len(), 1);
    assert_eq!(
        FieldKind::parse(&body[0].key),
        FieldKind::AliasName("trigger".into())
    );
}

#[test]
fn single_alias_cycle_is_capped() {
    let graph = build(&[(
        "cycle.cwt",
        "single_alias[loop] = single_alias_right[loop]\nuse = { x = single_alias_right[loop] }\n",
    )]);
    let rules = &graph.type_rules["use"];
    assert!(aliases::effective_block(&graph, &rules[0]).is_none());
}

#[test]
fn special_tables() {
    let graph = build(&[(
        "scopes.cwt",
        indoc! {r#"
            scopes = {
                Country = {
                    aliases = { country owner }
                }
                Province = {
                    aliases = { province }
                }
            }
        "#},
    ), (
        "links.cwt",
        indoc! {r#"
            links = {
                owner = {
                    input_scopes = { province }
                    output_scope = country
                }
                event_target = {
                    input_scopes = { any }
                    output_scope = any
                    prefix = event_target:
                    from_data = yes
                    data_source = value[event_target]
                    type = both
                }
            }
        "#},
    ), (
        "modifiers.cwt",
        indoc! {r#"
            modifiers = {
                land_morale = country
            }
            modifier_categories = {
                country = {
                    supported_scopes = { country }
                }
            }
        "#},
    ), (
        "localisation.cwt",
        indoc! {r#"
            localisation_commands = {
                GetName = { country province }
            }
        "#},
    ), (
        "values.cwt",
        indoc! {r#"
            values = {
                value[event_target] = { capital_scope }
            }
        "#},
    )]);

    assert_eq!(graph.scopes.canonical("OWNER"), Some("country"));
    assert_eq!(graph.scopes.canonical("province"), Some("province"));
    assert_eq!(graph.scopes.canonical("any"), Some("any"));
    assert_eq!(graph.scopes.canonical("bogus"), None);

    let owner = &graph.links["owner"];
    assert!(owner.input_scopes.contains("province"));
    assert_eq!(owner.output_scope, "country");
    assert_eq!(owner.link_type, LinkType::Scope);

    let target = &graph.links["event_target"];
    assert!(target.from_data);
    assert_eq!(target.prefix.as_deref(), Some("event_target:"));
    assert_eq!(target.link_type, LinkType::Both);

    let morale = graph.modifiers.scopes_for("land_morale").unwrap();
    assert!(morale.contains("country"));
    assert!(graph.modifiers.scopes_for("bogus").is_none());

    assert!(graph.loc_commands["GetName"].contains("country"));
    assert!(graph.value_sets["event_target"].contains("capital_scope"));
}

#[test]
fn complex_enum_membership() {
    // Members are the object keys under `counter`.
    let graph = build(&[(
        "enums.cwt",
        indoc! {r#"
            enums = {
                complex_enum[event_chain_counter] = {
                    path = "game/common/event_chains"
                    name = {
                        counter = {
                            enum_name = {}
                        }
                    }
                }
                complex_enum[pathless] = {
                    name = {
                        enum_name = {}
                    }
                }
            }
        "#},
    )]);

    let files = MemoryFiles::new([
        (
            "common/event_chains/chains.txt",
            "counter = { my_counter = { } other_counter = { } }\nnot_counter = { ignored = { } }",
        ),
        ("common/elsewhere/chains.txt", "counter = { outside = { } }"),
    ]);

    let artifacts = SchemaArtifacts::materialize(&graph, &files);
    let members = &artifacts.complex_enum_members["event_chain_counter"];
    assert!(members.contains("my_counter"));
    assert!(members.contains("other_counter"));
    assert!(!members.contains("outside"));
    assert!(!members.contains("ignored"));

    // No path filter: matches nothing.
    assert!(artifacts.complex_enum_members["pathless"].is_empty());
}

#[test]
fn type_discovery() {
    let graph = build(&[("technologies.cwt", TECH_RULES)]);
    let files = MemoryFiles::new([
        (
            "common/technologies/army.txt",
            indoc! {r#"
                infantry_tech = {
                    start_year = 1444
                    category = land_tech
                }
                galleon_tech = {
                    start_year = 1500
                    category = naval_tech
                }
            "#},
        ),
        ("common/unrelated/other.txt", "stray = { }"),
    ]);

    let artifacts = SchemaArtifacts::materialize(&graph, &files);
    let ids = &artifacts.type_ids["technology"];
    assert_eq!(ids.len(), 2);
    assert!(ids["infantry_tech"].subtypes.contains("land"));
    assert!(ids["galleon_tech"].subtypes.contains("naval"));

    // Templated modifiers materialize per discovered id.
    assert!(
        artifacts
            .templated_modifiers
            .contains_key("infantry_tech_cost_factor")
    );

    // Subtype selection agrees with discovery.
    let parsed = clauser_syntax::ParsedSource::parse(
        "infantry_tech = { category = land_tech }",
        clauser_syntax::ParseOptions::jomini(),
    );
    let facts = parsed.facts();
    let entries = types::entry_objects(
        &graph.types["technology"],
        facts,
        "common/technologies/army.txt",
    );
    assert_eq!(entries.len(), 1);
    let subtype = subtypes::select_subtype(
        &graph.types["technology"],
        entries[0].key.as_deref(),
        entries[0].object,
    )
    .unwrap();
    assert_eq!(subtype.name, "land");
}

#[test]
fn name_field_and_unique() {
    let graph = build(&[(
        "events.cwt",
        indoc! {r#"
            types = {
                type[event] = {
                    path = "game/events"
                    name_field = id
                    skip_root_key = namespace
                    unique = yes
                }
            }
        "#},
    )]);

    let files = MemoryFiles::new([(
        "events/my_events.txt",
        indoc! {r#"
            namespace = {
                event = { id = my.1 }
                event = { id = my.2 }
                event = { id = my.1 }
                event = { fire_only_once = yes }
            }
        "#},
    )]);

    let (ids, diagnostics) = types::discover_types(&graph, &files);
    let event_ids: Vec<&String> = ids["event"].keys().collect();
    assert_eq!(event_ids, vec!["my.1", "my.2"]);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, types::TYPECHECK_DUPLICATE_DEFINITION);
}

#[test]
fn deterministic_artifacts() {
    let graph = build(&[("technologies.cwt", TECH_RULES)]);
    let files = MemoryFiles::new([(
        "common/technologies/a.txt",
        "a_tech = { category = land_tech }\nb_tech = { category = naval_tech }",
    )]);

    let first = SchemaArtifacts::materialize(&graph, &files);
    let second = SchemaArtifacts::materialize(&graph, &files);
    assert_eq!(first.type_ids, second.type_ids);
    assert_eq!(first.complex_enum_members, second.complex_enum_members);
    assert_eq!(first.templated_modifiers, second.templated_modifiers);
}
