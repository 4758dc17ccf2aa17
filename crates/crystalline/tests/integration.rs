//! Integration tests for crystalline
//!
//! Elements over documents loaded with crystalline-html.

use std::rc::Rc;

use anyhow::{Result, anyhow};
use crystalline::{
    CrystallineElement, ElementDefinition, ElementRegistry, Phase, QueryDecl, RenderRoot,
};
use crystalline_dom::{DomTree, Event, NodeId};
use crystalline_html::HtmlParser;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Default)]
struct TodoList {
    calls: Vec<String>,
}

impl TodoList {
    fn record(&mut self, name: &str, event: &Event) {
        self.calls.push(format!("{}:{}", name, event.event_type()));
    }
}

fn add(list: &mut TodoList, event: &Event) {
    list.record("add", event);
}

fn save(list: &mut TodoList, event: &Event) {
    list.record("save", event);
}

fn search(list: &mut TodoList, event: &Event) {
    list.record("search", event);
}

fn pick(list: &mut TodoList, event: &Event) {
    list.record("pick", event);
}

fn refresh(list: &mut TodoList, event: &Event) {
    list.record("refresh", event);
}

fn definition() -> Result<Rc<ElementDefinition<TodoList>>> {
    let definition = ElementDefinition::builder("todo-list")
        .property("title", "Todos")
        .property("done", 0)
        .query("submit", QueryDecl::single("button@submit"))
        .query("items", QueryDecl::all("li"))
        .query("submits", QueryDecl::all("@submit"))
        .method("add", add)
        .method("save", save)
        .method("search", search)
        .method("pick", pick)
        .method("refresh", refresh)
        .build()?;
    Ok(Rc::new(definition))
}

fn load(html: &str) -> Result<(DomTree, NodeId)> {
    let tree = HtmlParser::new().parse(html)?.into_tree();
    let host = tree
        .query_selector(tree.root(), "todo-list")?
        .ok_or_else(|| anyhow!("fixture has no <todo-list>"))?;
    Ok((tree, host))
}

fn select(tree: &DomTree, selector: &str) -> Result<NodeId> {
    tree.query_selector(tree.root(), selector)?
        .ok_or_else(|| anyhow!("no match for {selector}"))
}

fn mount(html: &str) -> Result<(DomTree, CrystallineElement<TodoList>)> {
    init_tracing();
    let (mut tree, host) = load(html)?;
    let mut element = CrystallineElement::new(definition()?, host, TodoList::default());
    let report = element.connect(&mut tree);
    assert!(report.is_clean(), "{:?}", report.diagnostics);
    Ok((tree, element))
}

fn calls(element: &CrystallineElement<TodoList>) -> Vec<String> {
    element.component().borrow().calls.clone()
}

#[test]
fn test_bare_method_on_button_binds_click() -> Result<()> {
    let (tree, element) = mount(r#"<todo-list><button todo-list-action="add">Add</button></todo-list>"#)?;
    let button = select(&tree, "button")?;

    assert_eq!(tree.listener_count(button), 1);
    let bound: Vec<_> = element.reconciler().registry().for_node(button).collect();
    assert_eq!(bound.len(), 1);
    assert_eq!(bound[0].event, "click");
    assert_eq!(bound[0].name, "add");

    tree.dispatch_event(button, "click");
    assert_eq!(calls(&element), vec!["add:click"]);
    Ok(())
}

#[test]
fn test_form_defaults_to_submit() -> Result<()> {
    let (tree, element) = mount(r#"<todo-list><form todo-list-action="save"></form></todo-list>"#)?;
    let form = select(&tree, "form")?;

    assert!(element.reconciler().registry().contains(form, "submit", "save"));
    tree.dispatch_event(form, "click");
    tree.dispatch_event(form, "submit");
    assert_eq!(calls(&element), vec!["save:submit"]);
    Ok(())
}

#[test]
fn test_input_defaults_depend_on_type() -> Result<()> {
    let (tree, element) = mount(
        r#"<todo-list>
            <input type="submit" todo-list-action="save">
            <input type="text" todo-list-action="search">
            <textarea todo-list-action="search"></textarea>
            <select todo-list-action="pick"></select>
        </todo-list>"#,
    )?;
    let registry = element.reconciler().registry();

    let submit = select(&tree, "input[type=submit]")?;
    let text = select(&tree, "input[type=text]")?;
    let textarea = select(&tree, "textarea")?;
    let choice = select(&tree, "select")?;
    assert!(registry.contains(submit, "click", "save"));
    assert!(registry.contains(text, "input", "search"));
    assert!(registry.contains(textarea, "input", "search"));
    assert!(registry.contains(choice, "change", "pick"));
    assert_eq!(registry.len(), 4);
    Ok(())
}

#[test]
fn test_attribute_changes_do_not_duplicate() -> Result<()> {
    let (mut tree, mut element) = mount(r#"<todo-list><button todo-list-action="add">Add</button></todo-list>"#)?;
    let button = select(&tree, "button")?;

    tree.set_attribute(button, "todo-list-action", "add")?;
    tree.set_attribute(button, "todo-list-action", "add")?;
    let report = element.pump(&mut tree);
    assert_eq!(report.bound, 0);
    assert_eq!(tree.listener_count(button), 1);

    tree.set_attribute(button, "todo-list-action", "add dblclick->save")?;
    let report = element.pump(&mut tree);
    assert_eq!(report.bound, 1);
    assert_eq!(tree.listener_count(button), 2);

    tree.dispatch_event(button, "click");
    assert_eq!(calls(&element), vec!["add:click"]);
    Ok(())
}

#[test]
fn test_nested_instance_is_not_bound() -> Result<()> {
    let (tree, element) = mount(
        r#"<todo-list id="outer">
            <button id="own" todo-list-action="add">Add</button>
            <todo-list id="inner" todo-list-action="refresh">
                <button id="theirs" todo-list-action="save">Save</button>
            </todo-list>
        </todo-list>"#,
    )?;
    let inner = select(&tree, "#inner")?;
    let theirs = select(&tree, "#theirs")?;

    assert_eq!(element.reconciler().nested_roots().as_slice(), &[inner]);
    assert_eq!(tree.listener_count(inner), 0);
    assert_eq!(tree.listener_count(theirs), 0);

    tree.dispatch_event(theirs, "click");
    assert!(calls(&element).is_empty());
    Ok(())
}

#[test]
fn test_removed_nested_root_frees_its_nodes() -> Result<()> {
    let (mut tree, mut element) = mount(
        r#"<todo-list id="outer">
            <todo-list id="inner"><button id="theirs" todo-list-action="save">Save</button></todo-list>
        </todo-list>"#,
    )?;
    let outer = select(&tree, "#outer")?;
    let inner = select(&tree, "#inner")?;
    let theirs = select(&tree, "#theirs")?;

    tree.detach(inner)?;
    element.pump(&mut tree);
    assert!(element.reconciler().nested_roots().is_empty());

    tree.append_child(outer, theirs)?;
    let report = element.pump(&mut tree);
    assert_eq!(report.bound, 1);

    tree.dispatch_event(theirs, "click");
    assert_eq!(calls(&element), vec!["save:click"]);
    Ok(())
}

#[test]
fn test_scoped_queries() -> Result<()> {
    let (tree, element) = mount(
        r#"<todo-list>
            <a todo-list-id="submit">Top</a>
            <ul>
                <li>one</li>
                <todo-list><li>nested</li><button todo-list-id="submit">Inner</button></todo-list>
                <li>two</li>
            </ul>
            <button todo-list-id="cancel">Cancel</button>
            <button todo-list-id="submit">Submit</button>
        </todo-list>"#,
    )?;

    let submit = element
        .query_one(&tree, "_submit")
        .ok_or_else(|| anyhow!("submit query found nothing"))?;
    assert_eq!(tree.text_content(submit), "Submit");
    assert_eq!(element.query_one(&tree, "submit"), Some(submit));

    let items: Vec<_> = element
        .query_all(&tree, "_items")
        .into_iter()
        .map(|li| tree.text_content(li))
        .collect();
    assert_eq!(items, vec!["one", "two"]);

    let submits: Vec<_> = element
        .query_all(&tree, "_submits")
        .into_iter()
        .map(|node| tree.text_content(node))
        .collect();
    assert_eq!(submits, vec!["Top", "Submit"]);

    assert_eq!(element.query_one(&tree, "_nothing"), None);
    assert!(element.query_all(&tree, "_nothing").is_empty());
    Ok(())
}

#[test]
fn test_disconnect_stops_dispatch() -> Result<()> {
    let (mut tree, mut element) = mount(
        r#"<todo-list todo-list-action="focus->refresh"><button todo-list-action="add">Add</button></todo-list>"#,
    )?;
    let button = select(&tree, "button")?;
    let host = element.root();

    tree.dispatch_event(button, "click");
    assert_eq!(element.disconnect(&mut tree), 2);
    assert!(!element.is_connected());
    assert_eq!(element.phase(), Phase::Unobserved);

    tree.dispatch_event(button, "click");
    tree.dispatch_event(host, "focus");
    assert_eq!(calls(&element), vec!["add:click"]);
    assert_eq!(tree.total_listeners(), 0);

    // mutations after disconnect are not picked up
    tree.set_attribute(button, "todo-list-action", "save")?;
    assert_eq!(element.pump(&mut tree).bound, 0);
    Ok(())
}

#[test]
fn test_fragment_insertion_binds_new_nodes() -> Result<()> {
    let (mut tree, mut element) = mount("<todo-list><ul></ul></todo-list>")?;
    let list = select(&tree, "ul")?;

    let inserted = HtmlParser::new().parse_into(
        &mut tree,
        list,
        r#"<li todo-list-action="pick">a</li><li todo-list-action="pick">b</li>"#,
    )?;
    let report = element.pump(&mut tree);
    assert_eq!(report.bound, 2);

    tree.dispatch_event(inserted[1], "click");
    assert_eq!(calls(&element), vec!["pick:click"]);
    Ok(())
}

#[test]
fn test_registry_and_definition_options() -> Result<()> {
    init_tracing();
    let mut registry = ElementRegistry::new();
    let definition = registry.define(
        ElementDefinition::<TodoList>::builder("todo-item")
            .shadow_dom(false)
            .property("label", "untitled")
            .build()?,
    )?;
    assert!(registry.is_defined("todo-item"));

    let (tree, host) = load("<todo-list><todo-item></todo-item></todo-list>")?;
    let item = tree
        .query_selector(host, "todo-item")?
        .ok_or_else(|| anyhow!("no <todo-item>"))?;
    let element: CrystallineElement<TodoList> =
        CrystallineElement::new(definition, item, TodoList::default());

    assert_eq!(element.render_root(), RenderRoot::Light);
    assert_eq!(element.render(), Some("<slot></slot>"));
    assert_eq!(element.property("label"), Some(&serde_json::json!("untitled")));
    Ok(())
}
