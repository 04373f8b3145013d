use std::path::PathBuf;

use nameplan::actions::{ActionHeader, ContentChange, RefactorAction, RiskLevel, RollbackData, TextReplacement};
use nameplan::conflicts::{self, ConflictType};
use nameplan::plan::ErrorCode;
use nameplan::rules::{ContextRuleSpec, PatternSpec, ValidatorSpec};
use nameplan::types::{Category, Severity};
use nameplan::{
    Error, RefactorPlan, RuleSet, ScanOptions, ScanResult, Scanner, SourceFile, create_plan, graph, optimize_plan,
    planfile, validate_plan,
};

fn pattern(id: &str, category: Category, incorrect: &str, glob: &str, replacement: &str) -> PatternSpec {
    PatternSpec {
        category,
        correct: String::new(),
        id: id.to_string(),
        incorrect: vec![incorrect.to_string()],
        rules: vec![ContextRuleSpec {
            glob: glob.to_string(),
            replacement: replacement.to_string(),
            severity: Severity::High,
            validator: ValidatorSpec::Always,
        }],
    }
}

fn scan(specs: &[PatternSpec], files: &[(&str, &str)]) -> ScanResult {
    scan_with(specs, files, true)
}

fn scan_with(specs: &[PatternSpec], files: &[(&str, &str)], keep_snapshots: bool) -> ScanResult {
    let rules = RuleSet::compile(specs).unwrap();
    let sources: Vec<SourceFile> = files.iter().map(|(path, content)| SourceFile::new(*path, *content)).collect();
    let options = ScanOptions { keep_snapshots, ..ScanOptions::default() };
    Scanner::with_options(&rules, options).scan(&sources)
}

/// Two files, each with one independent variable fix.
fn two_edits() -> RefactorPlan {
    let specs = [pattern("vars", Category::Variable, r"\bbad_(\w+)\b", "*.ts", "good_$1")];
    let result = scan(&specs, &[("src/a.ts", "let bad_one = 1;\n"), ("src/b.ts", "let bad_two = 2;\n")]);
    create_plan(&result).unwrap()
}

fn position(plan: &RefactorPlan, id: &str) -> usize {
    plan.execution_order.iter().position(|x| x == id).unwrap()
}

#[test]
fn env_fix_without_rule_and_import_rename_plan_end_to_end() {
    let specs = [
        // No rule covers TypeScript files, so the match carries no fix.
        pattern("env-prefix", Category::Environment, r"\bWRONG_PREFIX_([A-Z0-9_]+)\b", "*.env", "APP_$1"),
        pattern("kebab-modules", Category::File, r"\bold-module\b", "*.ts", "new-module"),
    ];
    let result = scan(&specs, &[
        ("src/config.ts", "export const key = process.env.WRONG_PREFIX_KEY;\n"),
        ("src/app.ts", "import { helper } from './old-module';\n"),
        ("src/old-module.ts", "export const helper = 1;\n"),
    ]);
    assert_eq!(result.total_matches, 2);

    let plan = create_plan(&result).unwrap();
    assert_eq!(plan.renames.len(), 1);
    assert_eq!(plan.reference_updates.len(), 1);
    assert!(plan.content_changes.is_empty());
    assert!(plan.conflicts.is_empty(), "unexpected conflicts: {:?}", plan.conflicts);

    let rename = &plan.renames[0];
    let update = &plan.reference_updates[0];
    assert_eq!(rename.old_path, PathBuf::from("src/old-module.ts"));
    assert_eq!(rename.new_path, PathBuf::from("src/new-module.ts"));
    assert_eq!(update.header.depends_on, vec![rename.header.id.clone()]);
    assert_eq!(update.new_reference, "./new-module");
    assert_eq!(plan.execution_order, vec![rename.header.id.clone(), update.header.id.clone()]);

    let verdict = validate_plan(&plan);
    assert!(verdict.is_valid, "{:?}", verdict.errors);
    let optimized = optimize_plan(&plan).unwrap();
    assert_eq!(optimized.execution_order, plan.execution_order);
}

#[test]
fn import_path_after_same_named_identifier_plans_a_rename_without_snapshots() {
    let specs = [pattern("camel-modules", Category::File, r"\boldModule\b", "*.ts", "newModule")];
    let files = [
        ("src/app.ts", "import { oldModule } from './oldModule';\n"),
        ("src/oldModule.ts", "export const value = 1;\n"),
    ];

    for keep_snapshots in [true, false] {
        let result = scan_with(&specs, &files, keep_snapshots);
        assert_eq!(result.files[0].snapshot.is_some(), keep_snapshots);
        let plan = create_plan(&result).unwrap();

        assert_eq!(plan.renames.len(), 1, "snapshots: {keep_snapshots}");
        assert_eq!(plan.renames[0].old_path, PathBuf::from("src/oldModule.ts"));
        assert_eq!(plan.renames[0].new_path, PathBuf::from("src/newModule.ts"));
        assert_eq!(plan.reference_updates.len(), 1, "snapshots: {keep_snapshots}");
        assert_eq!(plan.reference_updates[0].new_reference, "./newModule");
        // The imported identifier is still edited in place.
        assert_eq!(plan.content_changes.len(), 1, "snapshots: {keep_snapshots}");
        assert_eq!(plan.content_changes[0].replacements[0].column, 10);
        assert!(validate_plan(&plan).is_valid);
    }
}

#[test]
fn planning_is_deterministic() {
    let specs = [
        pattern("classes", Category::Class, r"\bOldService\b", "*.ts", "NewService"),
        pattern("vars", Category::Variable, r"\bbad_(\w+)\b", "*.ts", "good_$1"),
    ];
    let files = [
        ("src/old-service.ts", "export class OldService {}\nlet bad_flag = true;\n"),
        ("src/app.ts", "const bad_value = 1;\n"),
    ];

    let first = scan(&specs, &files);
    let second = scan(&specs, &files);
    assert_eq!(serde_json::to_string(&first).unwrap(), serde_json::to_string(&second).unwrap());

    let a = create_plan(&first).unwrap();
    let b = create_plan(&second).unwrap();
    assert_eq!(a.id, b.id);
    let ids = |p: &RefactorPlan| p.actions().iter().map(|x| x.id().to_string()).collect::<Vec<_>>();
    assert_eq!(ids(&a), ids(&b));
    assert_eq!(a.renames, b.renames);
    assert_eq!(a.content_changes, b.content_changes);
    assert_eq!(a.execution_order, b.execution_order);
}

#[test]
fn rename_precedes_content_change_that_mentions_it() {
    let specs = [
        pattern("classes", Category::Class, r"\bOldService\b", "*.ts", "NewService"),
        pattern("vars", Category::Variable, r"\bloadOld\b", "*.ts", "loadNew"),
    ];
    let result = scan(&specs, &[
        ("src/app.ts", "const svc = loadOld(); // see old-service.ts\n"),
        ("src/old-service.ts", "export class OldService {}\n"),
    ]);
    let plan = optimize_plan(&create_plan(&result).unwrap()).unwrap();

    let rename = &plan.renames[0];
    assert_eq!(rename.new_path, PathBuf::from("src/new-service.ts"));
    let app_change = plan.content_changes.iter().find(|c| c.file == PathBuf::from("src/app.ts")).unwrap();
    assert!(position(&plan, &rename.header.id) < position(&plan, &app_change.header.id));
    for change in &plan.content_changes {
        assert!(position(&plan, &rename.header.id) < position(&plan, &change.header.id));
    }
}

#[test]
fn mutual_dependency_is_circular_and_not_optimized() {
    let mut plan = two_edits();
    let a = plan.content_changes[0].header.id.clone();
    let b = plan.content_changes[1].header.id.clone();
    plan.content_changes[0].header.depends_on.push(b.clone());
    plan.content_changes[1].header.depends_on.push(a.clone());

    let verdict = validate_plan(&plan);
    assert!(!verdict.is_valid);
    let cycle = verdict.errors.iter().find(|e| e.code == ErrorCode::CircularDependency).unwrap();
    assert!(cycle.related_actions.contains(&a));
    assert!(cycle.related_actions.contains(&b));

    match optimize_plan(&plan) {
        Err(Error::PlanRejected { count, .. }) => assert!(count >= 1),
        other => panic!("expected rejection, got {other:?}"),
    }
}

fn change(id: &str, offset: usize) -> ContentChange {
    let file = PathBuf::from("src/shared.ts");
    ContentChange {
        file: file.clone(),
        header: ActionHeader {
            depends_on: Vec::new(),
            estimated_risk: RiskLevel::Low,
            id: id.to_string(),
            priority: 20,
            rollback: RollbackData::RestoreContent { backup: None, file },
            source: "src/shared.ts".to_string(),
            target: "src/shared.ts".to_string(),
        },
        replacements: vec![TextReplacement {
            category: Category::Variable,
            column: u32::try_from(offset + 1).unwrap(),
            context: "x".repeat(40),
            length: 10,
            line: 1,
            offset,
            original: "y".repeat(10),
            replacement: "z".repeat(10),
        }],
    }
}

#[test]
fn overlapping_edits_conflict_once_in_either_order() {
    let first = change("content-first", 10);
    let second = change("content-second", 15);

    for actions in [
        vec![RefactorAction::Content(&first), RefactorAction::Content(&second)],
        vec![RefactorAction::Content(&second), RefactorAction::Content(&first)],
    ] {
        let found = conflicts::detect(&actions, &graph::analyze(&actions), &[]);
        assert_eq!(found.len(), 1, "{found:?}");
        assert_eq!(found[0].conflict_type, ConflictType::ContentConflict);
        assert_eq!(found[0].action_ids, vec!["content-first".to_string(), "content-second".to_string()]);
    }
}

#[test]
fn independent_actions_keep_declaration_order() {
    let plan = two_edits();
    let declared: Vec<String> = plan.actions().iter().map(|a| a.id().to_string()).collect();
    assert_eq!(plan.execution_order, declared);
    assert_eq!(optimize_plan(&plan).unwrap().execution_order, declared);
}

#[test]
fn plan_survives_a_round_trip_with_rollback_data() {
    let specs = [pattern("classes", Category::Class, r"\bOldService\b", "*.ts", "NewService")];
    let result = scan(&specs, &[("src/old-service.ts", "export class OldService {}\n")]);
    let plan = create_plan(&result).unwrap();
    assert!(matches!(
        &plan.content_changes[0].header.rollback,
        RollbackData::RestoreContent { backup: Some(b), .. } if b.contains("OldService")
    ));

    let text = planfile::serialize(&plan).unwrap();
    assert_eq!(planfile::parse(&text).unwrap(), plan);
}

#[test]
fn validation_is_idempotent() {
    let mut plan = two_edits();
    plan.content_changes[0].header.depends_on.push("rename-000000000000".to_string());
    assert_eq!(validate_plan(&plan), validate_plan(&plan));
}
