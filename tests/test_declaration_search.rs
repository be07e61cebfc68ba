//! Declaration Search Integration Tests
//!
//! End-to-end searches over solutions built from in-memory source projects
//! and metadata references, through the public API only.

use std::sync::Arc;

use declaration_finder::{
    find_all_declarations_with_normal_query, find_metadata_declarations_with_normal_query,
    find_source_declarations_with_normal_query,
    find_source_declarations_with_normal_query_in_project, Compilation, Declaration,
    FinderConfig, MetadataImage, MetadataReference, NamespaceExtent, Project, SearchQuery,
    Solution, SourceDocument, SourceProject, Symbol, SymbolFilter, SymbolKind,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn names(symbols: &[Symbol]) -> Vec<String> {
    symbols.iter().map(|s| s.qualified_name()).collect()
}

/// Foo (type) with member Bar, and namespace System
fn scenario_project() -> SourceProject {
    SourceProject::new("P").with_document(SourceDocument::new(
        "src/Foo.cs",
        vec![
            Declaration::class("Foo")
                .with_child(Declaration::method("Bar"))
                .with_child(Declaration::method("FooBar")),
            Declaration::namespace("System"),
        ],
    ))
}

fn system_reference() -> MetadataReference {
    MetadataReference::from_declarations(
        "ref/System.dll",
        "System",
        vec![Declaration::namespace("System").with_children([
            Declaration::class("Console")
                .with_child(Declaration::method("WriteLine"))
                .with_child(Declaration::new("Title", SymbolKind::Property))
                .with_child(Declaration::method("get_Title").accessor()),
            Declaration::class("String").with_child(Declaration::method(".ctor").implicit()),
        ])],
    )
    .unwrap()
}

async fn collect_source(
    project: &dyn Project,
    query: &SearchQuery,
    filter: SymbolFilter,
) -> Vec<Symbol> {
    let mut results = Vec::new();
    find_source_declarations_with_normal_query_in_project(
        project,
        query,
        filter,
        &mut results,
        None,
        None,
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    results
}

// =============================================================================
// Source collection
// =============================================================================

#[tokio::test]
async fn test_exact_name_excludes_members_and_namespaces() {
    let project = scenario_project();
    let found = collect_source(
        &project,
        &SearchQuery::exact("Foo", false),
        SymbolFilter::TYPE | SymbolFilter::MEMBER,
    )
    .await;
    assert_eq!(names(&found), vec!["Foo"]);
}

#[tokio::test]
async fn test_substring_matches_in_declaration_order() {
    let project = scenario_project();
    let found = collect_source(
        &project,
        &SearchQuery::substring("Foo", false),
        SymbolFilter::TYPE | SymbolFilter::MEMBER,
    )
    .await;
    assert_eq!(names(&found), vec!["Foo", "Foo.FooBar"]);
}

#[tokio::test]
async fn test_impossible_name_never_compiles() {
    let project = scenario_project();
    let found = collect_source(
        &project,
        &SearchQuery::exact("NoSuchDeclaration", false),
        SymbolFilter::ALL,
    )
    .await;
    assert!(found.is_empty());
    assert!(!project.has_compilation());
}

#[tokio::test]
async fn test_regex_and_fuzzy_queries() {
    let project = scenario_project();
    let regex = collect_source(
        &project,
        &SearchQuery::regex("^Foo.+$").unwrap(),
        SymbolFilter::MEMBER,
    )
    .await;
    assert_eq!(names(&regex), vec!["Foo.FooBar"]);

    let fuzzy = collect_source(&project, &SearchQuery::fuzzy("Fo"), SymbolFilter::TYPE).await;
    assert_eq!(names(&fuzzy), vec!["Foo"]);
}

#[tokio::test]
async fn test_results_appended_after_existing_entries() {
    let project = scenario_project();
    let cancel = CancellationToken::new();
    let mut results = Vec::new();

    for query in ["Foo", "Bar"] {
        find_source_declarations_with_normal_query_in_project(
            &project,
            &SearchQuery::exact(query, false),
            SymbolFilter::ALL,
            &mut results,
            None,
            None,
            &cancel,
        )
        .await
        .unwrap();
    }
    assert_eq!(names(&results), vec!["Foo", "Foo.Bar"]);
}

#[tokio::test]
async fn test_translation_into_original_compilation() {
    let skeleton = SourceProject::new("Skeleton").with_document(SourceDocument::new(
        "src/Foo.cs",
        vec![Declaration::namespace("App").with_child(
            Declaration::class("Foo")
                .with_child(Declaration::method("Run"))
                .with_child(Declaration::method("Stop")),
        )],
    ));
    let original = Compilation::builder("Original")
        .with_document(vec![Declaration::namespace("App")
            .with_child(Declaration::class("Foo").with_child(Declaration::method("Run")))])
        .build();

    let mut results = Vec::new();
    find_source_declarations_with_normal_query_in_project(
        &skeleton,
        &SearchQuery::regex("^(Foo|Run|Stop)$").unwrap(),
        SymbolFilter::TYPE_AND_MEMBER,
        &mut results,
        Some(&original),
        Some(original.source_assembly()),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(names(&results), vec!["App.Foo", "App.Foo.Run"]);
    assert!(results.iter().all(|s| original.owns(s)));
}

// =============================================================================
// Metadata collection
// =============================================================================

#[tokio::test]
async fn test_metadata_collection_skips_synthesized_members() {
    let solution = Solution::default();
    let reference = system_reference();
    let compilation = Compilation::builder("App")
        .with_reference(reference.clone())
        .build();
    let assembly = compilation.assembly_for_reference(&reference).unwrap();

    let mut results = Vec::new();
    find_metadata_declarations_with_normal_query(
        &solution,
        assembly,
        Some(&reference),
        &SearchQuery::regex("^(get_)?Title$|^\\.ctor$").unwrap(),
        SymbolFilter::ALL,
        &mut results,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(names(&results), vec!["System.Console.Title"]);
}

#[tokio::test]
async fn test_metadata_without_reference_is_noop() {
    let solution = Solution::default();
    let compilation = Compilation::builder("App").build();
    let mut results = Vec::new();

    find_metadata_declarations_with_normal_query(
        &solution,
        compilation.source_assembly(),
        None,
        &SearchQuery::exact("Console", false),
        SymbolFilter::ALL,
        &mut results,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(results.is_empty());
}

// =============================================================================
// Solution searches
// =============================================================================

#[tokio::test]
async fn test_solution_search_keeps_project_order() {
    let lib = Arc::new(SourceProject::new("Lib").with_document(SourceDocument::new(
        "src/Widget.cs",
        vec![Declaration::namespace("Lib").with_child(Declaration::class("Widget"))],
    )));
    let empty = Arc::new(SourceProject::new("Empty"));
    let app = Arc::new(SourceProject::new("App").with_document(SourceDocument::new(
        "src/Widget.cs",
        vec![Declaration::namespace("App").with_children([
            Declaration::class("Widget"),
            Declaration::class("WidgetFactory"),
        ])],
    )));
    let solution = Solution::default()
        .with_project(lib.clone())
        .with_project(empty.clone())
        .with_project(app.clone());

    let found = find_source_declarations_with_normal_query(
        &solution,
        &SearchQuery::exact("widget", true),
        SymbolFilter::TYPE,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(names(&found), vec!["Lib.Widget", "App.Widget"]);
    assert!(!empty.has_compilation());
    let cancel = CancellationToken::new();
    let lib_compilation = lib.get_compilation(&cancel).await.unwrap();
    let app_compilation = app.get_compilation(&cancel).await.unwrap();
    assert!(lib_compilation.owns(&found[0]));
    assert!(app_compilation.owns(&found[1]));
}

#[tokio::test]
async fn test_all_declarations_collapse_namespaces() {
    let reference = system_reference();
    let project = SourceProject::new("App")
        .with_document(SourceDocument::new(
            "src/Extras.cs",
            vec![Declaration::namespace("System").with_child(Declaration::class("Extras"))],
        ))
        .with_reference(reference.clone());
    let solution = Solution::default();
    let cancel = CancellationToken::new();

    let found = find_all_declarations_with_normal_query(
        &solution,
        &project,
        &SearchQuery::exact("System", false),
        SymbolFilter::NAMESPACE,
        &cancel,
    )
    .await
    .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].namespace_extent(), Some(NamespaceExtent::Compilation));
    let compilation = project.get_compilation(&cancel).await.unwrap();
    assert!(compilation.owns(&found[0]));
}

#[tokio::test]
async fn test_all_declarations_source_then_references() {
    let reference = system_reference();
    let project = SourceProject::new("App")
        .with_document(SourceDocument::new(
            "src/Console.cs",
            vec![Declaration::namespace("App").with_child(Declaration::class("Console"))],
        ))
        .with_reference(reference);

    let found = find_all_declarations_with_normal_query(
        &Solution::default(),
        &project,
        &SearchQuery::exact("Console", false),
        SymbolFilter::TYPE,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(names(&found), vec!["App.Console", "System.Console"]);
}

#[tokio::test]
async fn test_cancelled_solution_search() {
    let solution = Solution::default().with_project(Arc::new(scenario_project()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = find_source_declarations_with_normal_query(
        &solution,
        &SearchQuery::exact("Foo", false),
        SymbolFilter::ALL,
        &cancel,
    )
    .await
    .unwrap_err();
    assert!(err.is_cancelled());
}

// =============================================================================
// Persisted indexes
// =============================================================================

fn write_reference(dir: &TempDir, file: &str, types: &[&str]) -> MetadataReference {
    let image = MetadataImage::new(
        "Lib",
        vec![Declaration::namespace("Lib")
            .with_children(types.iter().map(|name| Declaration::class(*name)))],
    );
    let path = dir.path().join(file);
    std::fs::write(&path, image.encode().unwrap()).unwrap();
    MetadataReference::load(&path).unwrap()
}

fn index_files(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "idx"))
                .count()
        })
        .unwrap_or(0)
}

#[tokio::test]
async fn test_indexes_persist_per_checksum() {
    let refs = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let config = FinderConfig::default().with_index_cache_dir(cache.path());
    let cancel = CancellationToken::new();

    let v1 = write_reference(&refs, "Lib.dll", &["Alpha"]);
    let project = SourceProject::new("App").with_reference(v1.clone());
    let found = find_all_declarations_with_normal_query(
        &Solution::new(config.clone()),
        &project,
        &SearchQuery::exact("Alpha", false),
        SymbolFilter::TYPE,
        &cancel,
    )
    .await
    .unwrap();
    assert_eq!(names(&found), vec!["Lib.Alpha"]);
    assert_eq!(index_files(cache.path()), 1);

    // Same path, new content: a second index keyed by the new checksum
    let v2 = write_reference(&refs, "Lib.dll", &["Alpha", "Beta"]);
    assert_ne!(v1.checksum(), v2.checksum());
    let project = SourceProject::new("App").with_reference(v2);
    let found = find_all_declarations_with_normal_query(
        &Solution::new(config),
        &project,
        &SearchQuery::exact("Beta", false),
        SymbolFilter::TYPE,
        &cancel,
    )
    .await
    .unwrap();
    assert_eq!(names(&found), vec!["Lib.Beta"]);
    assert_eq!(index_files(cache.path()), 2);
}

#[tokio::test]
async fn test_persistence_can_be_disabled() {
    let refs = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let mut config = FinderConfig::default().with_index_cache_dir(cache.path());
    config.persist_indexes = false;

    let reference = write_reference(&refs, "Lib.dll", &["Alpha"]);
    let project = SourceProject::new("App").with_reference(reference);
    let found = find_all_declarations_with_normal_query(
        &Solution::new(config),
        &project,
        &SearchQuery::exact("Alpha", false),
        SymbolFilter::TYPE,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(index_files(cache.path()), 0);
}
