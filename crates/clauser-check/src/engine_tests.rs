use clauser_cwt::{MemoryAssets, MemoryFiles, MemoryLocalisation, SchemaArtifacts, SchemaGraph};
use clauser_syntax::{
    Diagnostic, LocalisationCoverage, ParseOptions, ParsedSource, UnresolvedPolicy,
};
use indoc::indoc;

use crate::engine::{CheckEngine, CheckOptions, DynamicValues};
use crate::rules::codes;

fn schema(sources: &[(&str, &str)], project: &[(&str, &str)]) -> (SchemaGraph, SchemaArtifacts) {
    let (graph, diagnostics) = SchemaGraph::build(sources.iter().copied());
    assert!(
        diagnostics.is_empty(),
        "schema fixtures should be clean: {diagnostics:?}"
    );
    let provider = MemoryFiles::new(project.iter().copied());
    let artifacts = SchemaArtifacts::materialize(&graph, &provider);
    (graph, artifacts)
}

fn check(graph: &SchemaGraph, artifacts: &SchemaArtifacts, path: &str, source: &str) -> Vec<Diagnostic> {
    check_opts(graph, artifacts, path, source, ParseOptions::jomini())
}

fn check_opts(
    graph: &SchemaGraph,
    artifacts: &SchemaArtifacts,
    path: &str,
    source: &str,
    options: ParseOptions,
) -> Vec<Diagnostic> {
    let carrier = ParsedSource::parse(source, options);
    assert!(!carrier.has_errors(), "fixture must parse: {:?}", carrier.diagnostics());
    CheckEngine::new(graph, artifacts).check_file(path, &carrier, &DynamicValues::new())
}

const TECH_SCHEMA: &str = indoc! {r#"
    types = {
        type[technology] = {
            path = "game/common/technologies"
        }
    }

    technology = {
        ## cardinality = 1..1
        start_year = int[0..2000]
        ## cardinality = 0..1
        category = enum[tech_category]
        ## cardinality = 0..1
        requires = <technology>
        ## cardinality = 0..1
        color = { int }
    }

    enums = {
        enum[tech_category] = { land_tech naval_tech }
    }
"#};

const TECH_PATH: &str = "common/technologies/army.txt";

#[test]
fn clean_entry_produces_no_diagnostics() {
    let (graph, artifacts) = schema(&[("tech.cwt", TECH_SCHEMA)], &[]);
    let diags = check(
        &graph,
        &artifacts,
        TECH_PATH,
        indoc! {r#"
            infantry_tech = {
                start_year = 1444
                category = land_tech
            }
        "#},
    );
    assert!(diags.is_empty(), "{diags:?}");
}

#[test]
fn required_field_missing_at_key_range() {
    // A technology without its mandatory start_year.
    let (graph, artifacts) = schema(&[("tech.cwt", TECH_SCHEMA)], &[]);
    let source = "infantry_tech = {\n    category = land_tech\n}\n";
    let diags = check(&graph, &artifacts, TECH_PATH, source);

    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, codes::TYPECHECK_REQUIRED_FIELD_MISSING);
    assert_eq!(
        &source[std::ops::Range::<usize>::from(diags[0].range)],
        "infantry_tech"
    );
}

#[test]
fn cardinality_maximum() {
    let (graph, artifacts) = schema(&[("tech.cwt", TECH_SCHEMA)], &[]);
    let source = indoc! {r#"
        infantry_tech = {
            start_year = 1444
            category = land_tech
            category = naval_tech
        }
    "#};
    let diags = check(&graph, &artifacts, TECH_PATH, source);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, codes::TYPECHECK_CARDINALITY_VIOLATION);
    // Points at the second occurrence.
    let at = usize::from(diags[0].range.start());
    assert_eq!(&source[at..at + 8], "category");
    assert!(at > source.find("land_tech").unwrap());
}

#[test]
fn invalid_field_type() {
    let (graph, artifacts) = schema(&[("tech.cwt", TECH_SCHEMA)], &[]);
    let diags = check(
        &graph,
        &artifacts,
        TECH_PATH,
        "infantry_tech = { start_year = soon }\n",
    );
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, codes::TYPECHECK_INVALID_FIELD_TYPE);
}

#[test]
fn int_range_is_enforced() {
    let (graph, artifacts) = schema(&[("tech.cwt", TECH_SCHEMA)], &[]);
    let diags = check(
        &graph,
        &artifacts,
        TECH_PATH,
        "infantry_tech = { start_year = 2300 }\n",
    );
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, codes::TYPECHECK_INVALID_FIELD_TYPE);
}

#[test]
fn enum_reference() {
    let (graph, artifacts) = schema(&[("tech.cwt", TECH_SCHEMA)], &[]);
    let diags = check(
        &graph,
        &artifacts,
        TECH_PATH,
        "infantry_tech = { start_year = 1444 category = space_tech }\n",
    );
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, codes::TYPECHECK_INVALID_FIELD_REFERENCE);
}

#[test]
fn type_reference_uses_discovered_ids() {
    let project = [(
        TECH_PATH,
        "infantry_tech = { start_year = 1400 }\ncavalry_tech = { start_year = 1450 }\n",
    )];
    let (graph, artifacts) = schema(&[("tech.cwt", TECH_SCHEMA)], &project);

    let ok = check(
        &graph,
        &artifacts,
        TECH_PATH,
        "musket_tech = { start_year = 1500 requires = infantry_tech }\n",
    );
    assert!(ok.is_empty(), "{ok:?}");

    let bad = check(
        &graph,
        &artifacts,
        TECH_PATH,
        "musket_tech = { start_year = 1500 requires = laser_tech }\n",
    );
    assert_eq!(bad.len(), 1);
    assert_eq!(bad[0].code, codes::TYPECHECK_INVALID_FIELD_REFERENCE);
}

#[test]
fn block_values_recurse_and_items_are_checked() {
    let (graph, artifacts) = schema(&[("tech.cwt", TECH_SCHEMA)], &[]);
    let ok = check(
        &graph,
        &artifacts,
        TECH_PATH,
        "infantry_tech = { start_year = 1 color = { 100 200 150 } }\n",
    );
    assert!(ok.is_empty(), "{ok:?}");

    let bad = check(
        &graph,
        &artifacts,
        TECH_PATH,
        "infantry_tech = { start_year = 1 color = { 100 fish } }\n",
    );
    assert_eq!(bad.len(), 1);
    assert_eq!(bad[0].code, codes::TYPECHECK_INVALID_FIELD_TYPE);
}

#[test]
fn tagged_block_value_checks_like_a_block() {
    let (graph, artifacts) = schema(&[("tech.cwt", TECH_SCHEMA)], &[]);
    let diags = check(
        &graph,
        &artifacts,
        TECH_PATH,
        "infantry_tech = { start_year = 1 color = rgb { 100 200 150 } }\n",
    );
    assert!(diags.is_empty(), "{diags:?}");
}

#[test]
fn complex_enum_membership() {
    // Complex enum members come from scanning project files.
    let schema_src = indoc! {r#"
        types = {
            type[event_chain] = {
                path = "game/common/event_chains"
            }
        }

        event_chain = {
            ## cardinality = 0..1
            advance = enum[event_chain_counter]
        }

        enums = {
            complex_enum[event_chain_counter] = {
                path = "game/common/event_chains"
                name = {
                    counter = {
                        enum_name = {}
                    }
                }
            }
        }
    "#};
    let project = [(
        "common/event_chains/chains.txt",
        "my_chain = { counter = { my_counter = { } } }\n",
    )];
    let (graph, artifacts) = schema(&[("chains.cwt", schema_src)], &project);

    let ok = check(
        &graph,
        &artifacts,
        "common/event_chains/more.txt",
        "other_chain = { advance = my_counter }\n",
    );
    assert!(ok.is_empty(), "{ok:?}");

    let bad = check(
        &graph,
        &artifacts,
        "common/event_chains/more.txt",
        "other_chain = { advance = other }\n",
    );
    assert_eq!(bad.len(), 1);
    assert_eq!(bad[0].code, codes::TYPECHECK_INVALID_FIELD_REFERENCE);
}

#[test]
fn unknown_keys_follow_policy() {
    let (graph, artifacts) = schema(&[("tech.cwt", TECH_SCHEMA)], &[]);
    let source = "infantry_tech = { start_year = 1 mystery = 5 }\n";

    // Defer: silent.
    let deferred = check(&graph, &artifacts, TECH_PATH, source);
    assert!(deferred.is_empty(), "{deferred:?}");

    // Error: reported.
    let options = ParseOptions {
        unresolved_reference_policy: UnresolvedPolicy::Error,
        ..ParseOptions::jomini()
    };
    let strict = check_opts(&graph, &artifacts, TECH_PATH, source, options);
    assert_eq!(strict.len(), 1);
    assert_eq!(strict[0].code, codes::TYPECHECK_UNRESOLVED_REFERENCE);
}

const EVENT_SCHEMA: &str = indoc! {r#"
    types = {
        type[event] = {
            path = "game/events"
        }
    }

    event = {
        ## replace_scope = { this = country root = country }
        ## cardinality = 0..1
        trigger = single_alias_right[trigger_clause]
        ## replace_scope = { this = country root = country }
        ## cardinality = 0..1
        modifier_block = {
            alias_name[modifier] = alias_match_left[modifier]
        }
        ## cardinality = 0..1
        set_flag = value_set[event_flag]
        ## cardinality = 0..1
        check_flag = value[event_flag]
        ## replace_scope = { this = country root = country }
        ## cardinality = 0..1
        capital = scope[province]
    }

    single_alias[trigger_clause] = {
        ## cardinality = 0..inf
        alias_name[trigger] = alias_match_left[trigger]
    }

    alias[trigger:always] = bool
    alias[trigger:num_cities] = int
    ## scope = province
    alias[trigger:controller_exists] = bool
    alias[trigger:AND] = single_alias_right[trigger_clause]

    scopes = {
        Country = { aliases = { country } }
        Province = { aliases = { province } }
    }

    links = {
        capital_scope = {
            input_scopes = { country }
            output_scope = province
        }
        owner = {
            input_scopes = { province }
            output_scope = country
        }
    }

    modifiers = {
        land_morale = country
    }
    modifier_categories = {
        country = {
            supported_scopes = { country }
        }
    }
"#};

const EVENT_PATH: &str = "events/my_events.txt";

#[test]
fn alias_execution() {
    let (graph, artifacts) = schema(&[("events.cwt", EVENT_SCHEMA)], &[]);

    let ok = check(
        &graph,
        &artifacts,
        EVENT_PATH,
        indoc! {r#"
            my_event = {
                trigger = {
                    always = yes
                    num_cities = 3
                    AND = {
                        always = no
                    }
                }
            }
        "#},
    );
    assert!(ok.is_empty(), "{ok:?}");

    let bad = check(
        &graph,
        &artifacts,
        EVENT_PATH,
        "my_event = { trigger = { always = maybe } }\n",
    );
    assert_eq!(bad.len(), 1);
    assert_eq!(bad[0].code, codes::TYPECHECK_INVALID_FIELD_TYPE);
}

#[test]
fn alias_member_scope_gate() {
    let (graph, artifacts) = schema(&[("events.cwt", EVENT_SCHEMA)], &[]);
    // `controller_exists` is province-only; the trigger block is country
    // scope via replace_scope.
    let diags = check(
        &graph,
        &artifacts,
        EVENT_PATH,
        "my_event = { trigger = { controller_exists = yes } }\n",
    );
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, codes::TYPECHECK_SCOPE_INCOMPATIBLE);
}

#[test]
fn scope_chain_field() {
    let (graph, artifacts) = schema(&[("events.cwt", EVENT_SCHEMA)], &[]);

    let ok = check(
        &graph,
        &artifacts,
        EVENT_PATH,
        "my_event = { capital = root.capital_scope }\n",
    );
    // `capital` wants province; root is any at the entry level, so the
    // chain resolves through capital_scope.
    assert!(ok.is_empty(), "{ok:?}");

    let bad = check(
        &graph,
        &artifacts,
        EVENT_PATH,
        "my_event = { capital = this }\n",
    );
    assert_eq!(bad.len(), 1);
    assert_eq!(bad[0].code, codes::TYPECHECK_SCOPE_INCOMPATIBLE);
}

#[test]
fn modifier_scope_compatibility() {
    let (graph, artifacts) = schema(&[("events.cwt", EVENT_SCHEMA)], &[]);

    let ok = check(
        &graph,
        &artifacts,
        EVENT_PATH,
        "my_event = { modifier_block = { land_morale = 0.5 } }\n",
    );
    assert!(ok.is_empty(), "{ok:?}");
}

#[test]
fn value_set_flows_across_files() {
    let (graph, artifacts) = schema(&[("events.cwt", EVENT_SCHEMA)], &[]);
    let engine = CheckEngine::new(&graph, &artifacts);

    let writer = ParsedSource::parse(
        "my_event = { set_flag = started_war }\n",
        ParseOptions::jomini(),
    );
    let reader = ParsedSource::parse(
        "other_event = { check_flag = started_war }\n",
        ParseOptions::jomini(),
    );
    let bad_reader = ParsedSource::parse(
        "third_event = { check_flag = never_written }\n",
        ParseOptions::jomini(),
    );

    let diags = engine.check_project(&[
        (EVENT_PATH, &writer),
        ("events/other.txt", &reader),
        ("events/third.txt", &bad_reader),
    ]);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, codes::TYPECHECK_INVALID_FIELD_REFERENCE);
    assert!(diags[0].message.contains("never_written"));
}

#[test]
fn custom_error_if_only_match() {
    let schema_src = indoc! {r#"
        types = {
            type[decision] = {
                path = "game/decisions"
            }
        }

        decision = {
            ## cardinality = 0..1
            potential = enum[known_forms]
            ## error_if_only_match = "use a known form here"
            ## cardinality = 0..1
            potential = scalar
        }

        enums = {
            enum[known_forms] = { standard special }
        }
    "#};
    let (graph, artifacts) = schema(&[("decisions.cwt", schema_src)], &[]);

    let ok = check(
        &graph,
        &artifacts,
        "decisions/a.txt",
        "my_decision = { potential = standard }\n",
    );
    assert!(ok.is_empty(), "{ok:?}");

    let flagged = check(
        &graph,
        &artifacts,
        "decisions/a.txt",
        "my_decision = { potential = homebrew }\n",
    );
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].code, codes::TYPECHECK_RULE_CUSTOM_ERROR);
    assert_eq!(flagged[0].message, "use a known form here");
}

#[test]
fn localisation_templates() {
    let schema_src = indoc! {r#"
        types = {
            type[technology] = {
                path = "game/common/technologies"
                localisation = {
                    ## required
                    name = "$"
                }
            }
        }

        technology = {
            ## cardinality = 0..1
            start_year = int
        }
    "#};
    let (graph, artifacts) = schema(&[("tech.cwt", schema_src)], &[]);
    let localisation = MemoryLocalisation::new([
        ("l_english", vec!["infantry_tech"]),
        ("l_french", vec![] as Vec<&str>),
    ]);

    let run = |source: &str, coverage: LocalisationCoverage| {
        let options = ParseOptions {
            localisation_coverage: coverage,
            ..ParseOptions::jomini()
        };
        let carrier = ParsedSource::parse(source, options);
        CheckEngine::new(&graph, &artifacts)
            .localisation(&localisation)
            .check_file(TECH_PATH, &carrier, &DynamicValues::new())
    };

    // Present in one locale: fine under `any`.
    let any = run("infantry_tech = { }\n", LocalisationCoverage::Any);
    assert!(any.is_empty(), "{any:?}");

    // ... but not under `all`.
    let all = run("infantry_tech = { }\n", LocalisationCoverage::All);
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].code, codes::TYPECHECK_LOCALISATION_MISSING);

    // Missing everywhere.
    let missing = run("cavalry_tech = { }\n", LocalisationCoverage::Any);
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].code, codes::TYPECHECK_LOCALISATION_MISSING);
}

#[test]
fn localisation_commands_in_interpolations() {
    let schema_src = indoc! {r#"
        types = {
            type[event] = {
                path = "game/events"
            }
        }

        event = {
            ## replace_scope = { this = province root = province }
            ## cardinality = 0..1
            tooltip = localisation
        }

        scopes = {
            Country = { aliases = { country } }
            Province = { aliases = { province } }
        }

        localisation_commands = {
            GetName = { country }
        }
    "#};
    let (graph, artifacts) = schema(&[("events.cwt", schema_src)], &[]);

    // `GetName` is country-only; the tooltip evaluates in province scope.
    let bad = check(
        &graph,
        &artifacts,
        EVENT_PATH,
        "my_event = { tooltip = \"[GetName] owns this\" }\n",
    );
    assert_eq!(bad.len(), 1);
    assert_eq!(bad[0].code, codes::TYPECHECK_SCOPE_INCOMPATIBLE);

    // Unknown commands follow the unresolved policy.
    let options = ParseOptions {
        unresolved_reference_policy: UnresolvedPolicy::Error,
        ..ParseOptions::jomini()
    };
    let unknown = check_opts(
        &graph,
        &artifacts,
        EVENT_PATH,
        "my_event = { tooltip = \"[GetFame]\" }\n",
        options,
    );
    assert_eq!(unknown.len(), 1);
    assert_eq!(unknown[0].code, codes::TYPECHECK_UNRESOLVED_REFERENCE);
}

#[test]
fn assets_gate_filepath_and_sprites() {
    let schema_src = indoc! {r#"
        types = {
            type[mission] = {
                path = "game/missions"
            }
        }

        mission = {
            ## cardinality = 0..1
            icon = icon[gfx/icons]
            ## cardinality = 0..1
            picture = <spriteType>
        }
    "#};
    let (graph, artifacts) = schema(&[("missions.cwt", schema_src)], &[]);
    let assets = MemoryAssets::new(["gfx/icons/war.dds"], ["GFX_mission_war"]);

    let run = |source: &str| {
        let carrier = ParsedSource::parse(source, ParseOptions::jomini());
        CheckEngine::new(&graph, &artifacts)
            .assets(&assets)
            .check_file("missions/a.txt", &carrier, &DynamicValues::new())
    };

    let ok = run("my_mission = { icon = war picture = GFX_mission_war }\n");
    assert!(ok.is_empty(), "{ok:?}");

    let bad = run("my_mission = { icon = peace picture = GFX_missing }\n");
    assert_eq!(bad.len(), 2);
    assert!(bad.iter().all(|d| d.code == codes::TYPECHECK_INVALID_FIELD_REFERENCE));

    // Without a registry, asset references defer.
    let carrier = ParsedSource::parse("my_mission = { icon = peace }\n", ParseOptions::jomini());
    let deferred = CheckEngine::new(&graph, &artifacts).check_file(
        "missions/a.txt",
        &carrier,
        &DynamicValues::new(),
    );
    assert!(deferred.is_empty(), "{deferred:?}");
}

#[test]
fn runaway_recursion_terminates_cleanly() {
    let (graph, artifacts) = schema(&[("events.cwt", EVENT_SCHEMA)], &[]);

    let mut source = String::from("my_event = { trigger = { ");
    for _ in 0..200 {
        source.push_str("AND = { ");
    }
    source.push_str("always = yes ");
    for _ in 0..200 {
        source.push_str("} ");
    }
    source.push_str("} }\n");

    let carrier = ParsedSource::parse(&source, ParseOptions::jomini());
    let diags = CheckEngine::new(&graph, &artifacts).check_file(
        EVENT_PATH,
        &carrier,
        &DynamicValues::new(),
    );
    // One fatal internal diagnostic, no panic, no cascade.
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, codes::TYPECHECK_INTERNAL);
}

#[test]
fn strict_modifier_metadata() {
    let schema_src = indoc! {r#"
        types = {
            type[event] = {
                path = "game/events"
            }
        }

        event = {
            ## cardinality = 0..1
            modifier_block = {
                alias_name[modifier] = alias_match_left[modifier]
            }
        }

        modifiers = {
            orphan_modifier = uncategorised
        }
    "#};
    let (graph, artifacts) = schema(&[("events.cwt", schema_src)], &[]);

    let carrier = ParsedSource::parse(
        "my_event = { modifier_block = { orphan_modifier = 1 } }\n",
        ParseOptions::jomini(),
    );
    let relaxed = CheckEngine::new(&graph, &artifacts).check_file(
        EVENT_PATH,
        &carrier,
        &DynamicValues::new(),
    );
    assert!(relaxed.is_empty(), "{relaxed:?}");

    let strict = CheckEngine::new(&graph, &artifacts)
        .options(CheckOptions {
            strict_modifiers: true,
        })
        .check_file(EVENT_PATH, &carrier, &DynamicValues::new());
    assert_eq!(strict.len(), 1);
    assert_eq!(strict[0].code, codes::TYPECHECK_MODIFIER_SCOPE);
}
