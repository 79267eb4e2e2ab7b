//! XML rendering for POM documents.
//!
//! Output is deterministic: fixed element order, two-space indentation,
//! `\n` line endings, no trailing whitespace. Signatures and checksums are
//! computed over these exact bytes.

use crate::model::{PomDependency, PomDocument};
use crate::{MODEL_VERSION, POM_NAMESPACE, POM_SCHEMA_LOCATION};

/// Escape text content for inclusion in an XML element.
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Incremental writer producing indented XML.
#[derive(Debug, Default)]
pub struct PomWriter {
    buf: String,
    depth: usize,
}

impl PomWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render a whole document.
    pub fn render(doc: &PomDocument) -> String {
        let mut w = Self::new();
        w.buf.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        w.line(&format!(
            "<project xmlns=\"{ns}\" xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
             xsi:schemaLocation=\"{ns} {loc}\">",
            ns = POM_NAMESPACE,
            loc = POM_SCHEMA_LOCATION
        ));
        w.depth += 1;

        w.element("modelVersion", MODEL_VERSION);
        w.element("groupId", &doc.group_id);
        w.element("artifactId", &doc.artifact_id);
        w.element("version", &doc.version);
        w.element("name", &doc.name);
        w.element("description", &doc.description);
        w.element("url", &doc.url);

        w.open("organization");
        w.element("name", &doc.organization.name);
        w.element("url", &doc.organization.url);
        w.close("organization");

        w.open("licenses");
        for license in &doc.licenses {
            w.open("license");
            w.element("name", &license.name);
            w.element("url", &license.url);
            w.close("license");
        }
        w.close("licenses");

        w.open("developers");
        for dev in &doc.developers {
            w.open("developer");
            w.element("id", &dev.id);
            w.element("name", &dev.name);
            w.element("email", &dev.email);
            w.close("developer");
        }
        w.close("developers");

        w.open("scm");
        w.element("connection", &doc.scm.connection);
        w.element("url", &doc.scm.url);
        w.close("scm");

        w.open("issueManagement");
        w.element("system", &doc.issue_management.system);
        w.element("url", &doc.issue_management.url);
        w.close("issueManagement");

        if !doc.dependencies.is_empty() {
            w.open("dependencies");
            for dep in &doc.dependencies {
                w.dependency(dep);
            }
            w.close("dependencies");
        }

        w.depth -= 1;
        w.line("</project>");
        w.buf
    }

    fn dependency(&mut self, dep: &PomDependency) {
        self.open("dependency");
        self.element("groupId", &dep.group_id);
        self.element("artifactId", &dep.artifact_id);
        self.element("version", &dep.version);
        self.element("scope", dep.scope.as_str());
        self.close("dependency");
    }

    fn open(&mut self, name: &str) {
        self.line(&format!("<{}>", name));
        self.depth += 1;
    }

    fn close(&mut self, name: &str) {
        self.depth -= 1;
        self.line(&format!("</{}>", name));
    }

    fn element(&mut self, name: &str, value: &str) {
        self.line(&format!("<{name}>{}</{name}>", escape_text(value)));
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.buf.push_str("  ");
        }
        self.buf.push_str(text);
        self.buf.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Developer, IssueManagement, License, Organization, Scm, Scope};

    fn document(dependencies: Vec<PomDependency>) -> PomDocument {
        PomDocument {
            group_id: "com.coditory.klog".to_string(),
            artifact_id: "klog-core".to_string(),
            version: "1.0.0".to_string(),
            name: "klog-core".to_string(),
            description: "Logs & <things>".to_string(),
            url: "https://github.com/coditory/klog".to_string(),
            organization: Organization {
                name: "Coditory".to_string(),
                url: "https://coditory.com".to_string(),
            },
            licenses: vec![License {
                name: "The Apache License, Version 2.0".to_string(),
                url: "https://www.apache.org/licenses/LICENSE-2.0.txt".to_string(),
            }],
            developers: vec![Developer {
                id: "ogesaku".to_string(),
                name: "ogesaku".to_string(),
                email: "ogesaku@gmail.com".to_string(),
            }],
            scm: Scm {
                connection: "scm:git:git://github.com/coditory/klog.git".to_string(),
                url: "https://github.com/coditory/klog".to_string(),
            },
            issue_management: IssueManagement {
                system: "GitHub".to_string(),
                url: "https://github.com/coditory/klog/issues".to_string(),
            },
            dependencies,
        }
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("a & b"), "a &amp; b");
        assert_eq!(escape_text("<x y=\"1\">"), "&lt;x y=&quot;1&quot;&gt;");
        assert_eq!(escape_text("it's"), "it&apos;s");
        assert_eq!(escape_text("plain"), "plain");
    }

    #[test]
    fn test_render_header_and_coordinates() {
        let xml = PomWriter::render(&document(vec![]));

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<project "));
        assert!(xml.contains("  <modelVersion>4.0.0</modelVersion>\n"));
        assert!(xml.contains("  <groupId>com.coditory.klog</groupId>\n"));
        assert!(xml.contains("  <artifactId>klog-core</artifactId>\n"));
        assert!(xml.ends_with("</project>\n"));
    }

    #[test]
    fn test_render_escapes_description() {
        let xml = PomWriter::render(&document(vec![]));
        assert!(xml.contains("<description>Logs &amp; &lt;things&gt;</description>"));
    }

    #[test]
    fn test_render_nested_blocks() {
        let xml = PomWriter::render(&document(vec![]));

        assert!(xml.contains(
            "  <licenses>\n    <license>\n      <name>The Apache License, Version 2.0</name>\n"
        ));
        assert!(xml.contains("    <developer>\n      <id>ogesaku</id>\n"));
        assert!(xml.contains(
            "  <scm>\n    <connection>scm:git:git://github.com/coditory/klog.git</connection>\n"
        ));
        assert!(xml.contains("  <issueManagement>\n    <system>GitHub</system>\n"));
    }

    #[test]
    fn test_no_dependencies_block_when_empty() {
        let xml = PomWriter::render(&document(vec![]));
        assert!(!xml.contains("<dependencies>"));
    }

    #[test]
    fn test_dependencies_keep_declaration_order() {
        let xml = PomWriter::render(&document(vec![
            PomDependency {
                group_id: "org.yaml".to_string(),
                artifact_id: "snakeyaml".to_string(),
                version: "2.2".to_string(),
                scope: Scope::Runtime,
            },
            PomDependency {
                group_id: "org.slf4j".to_string(),
                artifact_id: "slf4j-api".to_string(),
                version: "2.0.9".to_string(),
                scope: Scope::Compile,
            },
        ]));

        let yaml = xml.find("<artifactId>snakeyaml</artifactId>").unwrap();
        let slf4j = xml.find("<artifactId>slf4j-api</artifactId>").unwrap();
        assert!(yaml < slf4j);
        assert!(xml.contains("      <scope>runtime</scope>\n"));
        assert!(xml.contains("      <scope>compile</scope>\n"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let doc = document(vec![]);
        assert_eq!(PomWriter::render(&doc), PomWriter::render(&doc));
    }
}
