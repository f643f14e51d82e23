//! NuGet package specification

use taskpack_core::config::PackageConfig;

/// Render the nuspec document for a package version
pub fn render_nuspec(package: &PackageConfig, version: &str) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    xml.push_str("<package xmlns=\"http://schemas.microsoft.com/packaging/2010/07/nuspec.xsd\">\n");
    xml.push_str("   <metadata>\n");
    element(&mut xml, "id", &package.id);
    element(&mut xml, "version", version);
    element(&mut xml, "authors", &package.authors);
    element(&mut xml, "owners", &package.owners);
    element(
        &mut xml,
        "requireLicenseAcceptance",
        if package.require_license_acceptance { "true" } else { "false" },
    );
    element(&mut xml, "description", &package.description);
    element(&mut xml, "tags", &package.tags);
    xml.push_str("   </metadata>\n");
    xml.push_str("</package>\n");
    xml
}

fn element(xml: &mut String, name: &str, value: &str) {
    xml.push_str(&format!("      <{name}>{}</{name}>\n", escape_xml(value), name = name));
}

/// Escape text for XML element content
pub fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
