//! `ModuleConfig.xml` parsing: a small generic element tree built with
//! `quick-xml`'s pull reader, then converted into [`crate::fomod::model`]'s
//! typed shapes. FOMOD's schema has enough optional/order-independent
//! children that a generic tree plus typed conversion reads more plainly
//! than a single event-driven state machine.

use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::model::*;

#[derive(Debug, Default)]
pub struct XmlNode {
    pub name: String,
    pub attrs: BTreeMap<String, String>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn children_named<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(|s| s.as_str())
    }
}

pub fn parse_tree(xml: &str) -> Result<XmlNode, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<XmlNode> = vec![XmlNode {
        name: "#root".to_string(),
        ..Default::default()
    }];

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let node = XmlNode {
                    name: decode(e.name().as_ref()),
                    attrs: read_attrs(&e),
                    text: String::new(),
                    children: Vec::new(),
                };
                stack.push(node);
            }
            Ok(Event::Empty(e)) => {
                let node = XmlNode {
                    name: decode(e.name().as_ref()),
                    attrs: read_attrs(&e),
                    text: String::new(),
                    children: Vec::new(),
                };
                stack.last_mut().unwrap().children.push(node);
            }
            Ok(Event::End(_)) => {
                let done = stack.pop().ok_or("unbalanced xml")?;
                stack.last_mut().ok_or("unbalanced xml")?.children.push(done);
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| e.to_string())?.into_owned();
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(e.to_string()),
        }
    }

    let mut root = stack.pop().ok_or("empty document")?;
    root.children.pop().ok_or_else(|| "missing root element".to_string())
}

fn decode(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn read_attrs(e: &quick_xml::events::BytesStart) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    for a in e.attributes().flatten() {
        let key = decode(a.key.as_ref());
        let value = a.unescape_value().unwrap_or_default().into_owned();
        attrs.insert(key, value);
    }
    attrs
}

fn parse_order(node: &XmlNode, attr: &str) -> FomodOrder {
    match node.attr(attr) {
        Some("Explicit") => FomodOrder::Explicit,
        Some("Descending") => FomodOrder::Descending,
        _ => FomodOrder::Ascending,
    }
}

fn parse_select(raw: Option<&str>) -> FomodGroupSelect {
    match raw {
        Some("SelectAll") => FomodGroupSelect::SelectAll,
        Some("SelectAtMostOne") => FomodGroupSelect::SelectAtMostOne,
        Some("SelectExactlyOne") => FomodGroupSelect::SelectExactlyOne,
        Some("SelectAtLeastOne") => FomodGroupSelect::SelectAtLeastOne,
        _ => FomodGroupSelect::SelectAny,
    }
}

fn parse_type(raw: Option<&str>) -> FomodType {
    match raw {
        Some("NotUsable") => FomodType::NotUsable,
        Some("CouldBeUsable") => FomodType::CouldBeUsable,
        Some("Recommended") => FomodType::Recommended,
        Some("Required") => FomodType::Required,
        _ => FomodType::Optional,
    }
}

fn parse_src_dst(node: &XmlNode) -> FomodSrcDst {
    let src = node.attr("source").unwrap_or_default().to_string();
    let dst = node.attr("destination").unwrap_or(&src).to_string();
    let priority = node.attr("priority").and_then(|p| p.parse().ok()).unwrap_or(0);
    let always_install = node.attr("alwaysInstall").map(|v| v == "true").unwrap_or(false);
    let install_if_usable = node
        .attr("installIfUsable")
        .map(|v| v == "true")
        .unwrap_or(false);
    FomodSrcDst {
        src,
        dst,
        priority,
        always_install,
        install_if_usable,
    }
}

fn parse_files_and_folders(node: Option<&XmlNode>) -> FomodFilesAndFolders {
    let mut out = FomodFilesAndFolders::default();
    let Some(node) = node else { return out };
    for f in node.children_named("file") {
        out.files.push(parse_src_dst(f));
    }
    for f in node.children_named("folder") {
        out.folders.push(parse_src_dst(f));
    }
    out
}

fn parse_dependency_leaf(node: &XmlNode) -> Option<FomodDependencyNode> {
    match node.name.to_ascii_lowercase().as_str() {
        "flagdependency" => Some(FomodDependencyNode::Leaf(FomodDependencyLeaf::Flag {
            flag: node.attr("flag").unwrap_or_default().to_string(),
            value: node.attr("value").unwrap_or_default().to_string(),
        })),
        "filedependency" => {
            let state = match node.attr("state") {
                Some("Inactive") => FomodDependencyState::Inactive,
                Some("Missing") => FomodDependencyState::Missing,
                _ => FomodDependencyState::Active,
            };
            Some(FomodDependencyNode::Leaf(FomodDependencyLeaf::File {
                file: node.attr("file").unwrap_or_default().to_string(),
                state,
            }))
        }
        "gamedependency" | "fommdependency" => Some(FomodDependencyNode::Leaf(FomodDependencyLeaf::Game)),
        "dependencies" => Some(FomodDependencyNode::Composite(parse_dependencies(node))),
        _ => None,
    }
}

fn parse_dependencies(node: &XmlNode) -> FomodDependencies {
    let or_operator = node.attr("operator") == Some("Or");
    let dependencies = node.children.iter().filter_map(parse_dependency_leaf).collect();
    FomodDependencies {
        or_operator,
        dependencies,
    }
}

fn parse_optional_dependencies(node: &XmlNode, child_name: &str) -> Option<FomodDependencies> {
    node.child(child_name).map(|n| {
        n.child("dependencies")
            .map(parse_dependencies)
            .unwrap_or(FomodDependencies {
                or_operator: false,
                dependencies: Vec::new(),
            })
    })
}

fn parse_pattern(node: &XmlNode) -> FomodPattern {
    let dependencies = node.child("dependencies").map(parse_dependencies).unwrap_or(FomodDependencies {
        or_operator: false,
        dependencies: Vec::new(),
    });
    let fomod_type = node
        .child("type")
        .map(|t| parse_type(t.attr("name")))
        .unwrap_or(FomodType::Optional);
    FomodPattern {
        dependencies,
        fomod_type,
    }
}

fn parse_type_descriptor(node: Option<&XmlNode>) -> FomodTypeDescriptor {
    let Some(node) = node else {
        return FomodTypeDescriptor {
            default_type: FomodType::Optional,
            patterns: Vec::new(),
        };
    };
    if let Some(simple) = node.child("type") {
        return FomodTypeDescriptor {
            default_type: parse_type(simple.attr("name")),
            patterns: Vec::new(),
        };
    }
    if let Some(dependency_type) = node.child("dependencytype") {
        let default_type = dependency_type
            .child("defaulttype")
            .map(|t| parse_type(t.attr("name")))
            .unwrap_or(FomodType::Optional);
        let patterns = dependency_type
            .child("patterns")
            .map(|p| p.children_named("pattern").map(parse_pattern).collect())
            .unwrap_or_default();
        return FomodTypeDescriptor { default_type, patterns };
    }
    FomodTypeDescriptor {
        default_type: FomodType::Optional,
        patterns: Vec::new(),
    }
}

fn parse_plugin(node: &XmlNode) -> FomodPlugin {
    let name = node.attr("name").unwrap_or_default().to_string();
    let description = node.child("description").map(|d| d.text.clone()).unwrap_or_default();
    let files = parse_files_and_folders(node.child("files"));
    let condition_flags = node
        .child("conditionflags")
        .map(|cf| {
            cf.children_named("flag")
                .map(|f| (f.attr("name").unwrap_or_default().to_string(), f.text.clone()))
                .collect()
        })
        .unwrap_or_default();
    let type_descriptor = parse_type_descriptor(node.child("typedescriptor"));
    FomodPlugin {
        name,
        description,
        files,
        condition_flags,
        type_descriptor,
    }
}

fn parse_group(node: &XmlNode) -> FomodGroup {
    let name = node.attr("name").unwrap_or_default().to_string();
    let select = parse_select(node.attr("type"));
    let plugins_node = node.child("plugins");
    let order = plugins_node.map(|p| parse_order(p, "order")).unwrap_or(FomodOrder::Ascending);
    let plugins = plugins_node
        .map(|p| p.children_named("plugin").map(parse_plugin).collect())
        .unwrap_or_default();
    FomodGroup {
        name,
        select,
        order,
        plugins,
    }
}

fn parse_install_step(node: &XmlNode) -> FomodInstallStep {
    let name = node.attr("name").unwrap_or_default().to_string();
    let visible = parse_optional_dependencies(node, "visible");
    let groups_node = node.child("optionalfilegroups");
    let order = groups_node.map(|g| parse_order(g, "order")).unwrap_or(FomodOrder::Ascending);
    let groups = groups_node
        .map(|g| g.children_named("group").map(parse_group).collect())
        .unwrap_or_default();
    FomodInstallStep {
        name,
        order,
        groups,
        visible,
    }
}

fn parse_conditional_file_install(node: &XmlNode) -> FomodConditionalFileInstall {
    let dependencies = node.child("dependencies").map(parse_dependencies).unwrap_or(FomodDependencies {
        or_operator: false,
        dependencies: Vec::new(),
    });
    let files = parse_files_and_folders(node.child("files"));
    FomodConditionalFileInstall { dependencies, files }
}

/// Converts a parsed generic tree into the typed FOMOD module config.
/// `root` must be the `<config>` element.
pub fn to_module_config(root: &XmlNode) -> FomodModuleConfig {
    let module_name = root.child("modulename").map(|n| n.text.clone()).unwrap_or_default();
    let module_dependencies = parse_optional_dependencies(root, "moduledependencies");
    let required_install_files = parse_files_and_folders(root.child("requiredinstallfiles"));

    let install_steps_node = root.child("installsteps");
    let install_steps_order = install_steps_node
        .map(|n| parse_order(n, "order"))
        .unwrap_or(FomodOrder::Ascending);
    let install_steps = install_steps_node
        .map(|n| n.children_named("installstep").map(parse_install_step).collect())
        .unwrap_or_default();

    let conditional_file_installs = root
        .child("conditionalfileinstalls")
        .and_then(|n| n.child("patterns"))
        .map(|p| p.children_named("pattern").map(parse_conditional_file_install).collect())
        .unwrap_or_default();

    FomodModuleConfig {
        module_name,
        module_dependencies,
        required_install_files,
        install_steps_order,
        install_steps,
        conditional_file_installs,
    }
}

pub fn parse(xml: &str) -> Result<FomodModuleConfig, String> {
    let tree = parse_tree(xml)?;
    Ok(to_module_config(&tree))
}
