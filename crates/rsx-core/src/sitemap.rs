//! Sitemap read/write for ResourceSync list documents.
//!
//! ResourceSync piggybacks on the sitemap format: a `<urlset>` of `<url>`
//! entries, each with a `<loc>`, an optional `<lastmod>`, an optional
//! `<rs:md>` element carrying the ResourceSync extension attributes
//! (`hash`, `length`, `change`, `capability`, `type`) and any number of
//! `<rs:ln>` link elements.  Document-level `<rs:md>` and `<rs:ln>`
//! elements form the preamble and must precede the first `<url>`.
//! Parsing is namespace-aware and deliberately lax: the elements we
//! understand are extracted, everything else is left alone.

use rsx_schema::{Change, Ln, LnError, Resource, ResourceError, Timestamp};
use xot::{NameId, Node, Xot};

use crate::list::ResourceList;

/// Sitemap namespace shared with plain crawler sitemaps.
pub const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
/// ResourceSync terms namespace for the `rs:` extension elements.
pub const RS_NS: &str = "http://www.openarchives.org/rs/terms/";

/// Errors raised when reading or writing a sitemap document.
#[derive(thiserror::Error, Debug)]
pub enum SitemapError {
    /// The XML itself could not be parsed or serialized.
    #[error("XML error: {0}")]
    Xml(#[from] xot::Error),

    /// The document is a `<sitemapindex>`; the caller wanted a sitemap.
    /// Reported as its own variant so multi-document readers can branch.
    #[error("document is a sitemapindex, not a sitemap")]
    IsIndex,

    /// The root element is neither `<urlset>` nor `<sitemapindex>`.
    #[error("XML is not a sitemap: root element <{0}>")]
    NotSitemap(String),

    /// A `<url>` entry has no usable `<loc>` element.
    #[error("missing <loc> element in <url> entry")]
    MissingLoc,

    /// A `<url>` entry carries metadata that failed to normalize.
    #[error("invalid metadata for {uri}: {source}")]
    Metadata {
        /// URI of the offending entry.
        uri: String,
        /// The underlying value error.
        #[source]
        source: ResourceError,
    },

    /// An `<rs:ln>` element is missing a mandatory attribute or carries
    /// a bad one.
    #[error("invalid <rs:ln> in {context}: {source}")]
    Link {
        /// Entry URI, or `preamble` for document-level links.
        context: String,
        /// The underlying value error.
        #[source]
        source: LnError,
    },

    /// A document-level `<rs:md>` or `<rs:ln>` appeared after the first
    /// `<url>` entry, where it can no longer be a preamble.
    #[error("found <rs:{0}> after the first <url> entry")]
    MisplacedPreamble(&'static str),
}

/// Interned names used on both the read and write paths.
struct Names {
    urlset: NameId,
    sitemapindex: NameId,
    url: NameId,
    loc: NameId,
    lastmod: NameId,
    rs_md: NameId,
    rs_ln: NameId,
    capability: NameId,
    modified: NameId,
    hash: NameId,
    length: NameId,
    change: NameId,
    media_type: NameId,
    href: NameId,
    rel: NameId,
    pri: NameId,
}

impl Names {
    fn new(xot: &mut Xot) -> Self {
        let sitemap_ns = xot.add_namespace(SITEMAP_NS);
        let rs_ns = xot.add_namespace(RS_NS);
        Self {
            urlset: xot.add_name_ns("urlset", sitemap_ns),
            sitemapindex: xot.add_name_ns("sitemapindex", sitemap_ns),
            url: xot.add_name_ns("url", sitemap_ns),
            loc: xot.add_name_ns("loc", sitemap_ns),
            lastmod: xot.add_name_ns("lastmod", sitemap_ns),
            rs_md: xot.add_name_ns("md", rs_ns),
            rs_ln: xot.add_name_ns("ln", rs_ns),
            capability: xot.add_name("capability"),
            modified: xot.add_name("modified"),
            hash: xot.add_name("hash"),
            length: xot.add_name("length"),
            change: xot.add_name("change"),
            media_type: xot.add_name("type"),
            href: xot.add_name("href"),
            rel: xot.add_name("rel"),
            pri: xot.add_name("pri"),
        }
    }
}

/// Serialize a [`ResourceList`] as a sitemap document.
///
/// Emits the `<rs:md>` preamble when the list carries a capability or
/// modification instant, the document-level `<rs:ln>` elements, then one
/// `<url>` per resource in insertion order.  `lastmod` values are always
/// the canonical UTC form.
///
/// # Errors
///
/// Returns [`SitemapError::Xml`] if tree construction or serialization
/// fails.
pub fn write_xml(list: &ResourceList) -> Result<String, SitemapError> {
    let mut xot = Xot::new();
    let names = Names::new(&mut xot);

    // Seed the document from a skeleton so both namespace declarations sit
    // on the root element.
    let doc = xot.parse(&format!(r#"<urlset xmlns="{SITEMAP_NS}" xmlns:rs="{RS_NS}"/>"#))?;
    let urlset = xot.document_element(doc)?;

    if list.capability().is_some() || list.modified().is_some() {
        let md = xot.new_element(names.rs_md);
        if let Some(capability) = list.capability() {
            set_attribute(&mut xot, md, names.capability, capability);
        }
        if let Some(modified) = list.modified() {
            set_attribute(&mut xot, md, names.modified, &modified.to_string());
        }
        xot.append(urlset, md)?;
    }
    for ln in list.links() {
        let element = ln_element(&mut xot, &names, ln);
        xot.append(urlset, element)?;
    }

    for resource in list {
        let url = xot.new_element(names.url);

        let loc = xot.new_element(names.loc);
        let loc_text = xot.new_text(resource.uri());
        xot.append(loc, loc_text)?;
        xot.append(url, loc)?;

        if let Some(lastmod) = resource.lastmod() {
            let element = xot.new_element(names.lastmod);
            let text = xot.new_text(&lastmod);
            xot.append(element, text)?;
            xot.append(url, element)?;
        }

        let hash = resource.hash();
        let has_md = !hash.is_empty()
            || resource.length().is_some()
            || resource.change().is_some()
            || resource.capability().is_some()
            || resource.media_type().is_some();
        if has_md {
            let md = xot.new_element(names.rs_md);
            if let Some(capability) = resource.capability() {
                set_attribute(&mut xot, md, names.capability, capability);
            }
            if let Some(change) = resource.change() {
                set_attribute(&mut xot, md, names.change, change.token());
            }
            if !hash.is_empty() {
                set_attribute(&mut xot, md, names.hash, &hash);
            }
            if let Some(length) = resource.length() {
                set_attribute(&mut xot, md, names.length, &length.to_string());
            }
            if let Some(media_type) = resource.media_type() {
                set_attribute(&mut xot, md, names.media_type, media_type);
            }
            xot.append(url, md)?;
        }
        for ln in resource.links() {
            let element = ln_element(&mut xot, &names, ln);
            xot.append(url, element)?;
        }

        xot.append(urlset, url)?;
    }

    Ok(xot.to_string(doc)?)
}

/// Parse a sitemap document into a [`ResourceList`].
///
/// Lenient where the wire contract is lenient: unknown elements and
/// attributes are ignored, bad `hash` tokens are dropped during decode,
/// and duplicate URIs are logged with the first occurrence kept.  Bad
/// `lastmod`, `length`, `pri` values and misplaced preamble elements are
/// hard errors.
///
/// # Errors
///
/// Returns [`SitemapError::IsIndex`] for a `<sitemapindex>` root,
/// [`SitemapError::NotSitemap`] for any other non-`<urlset>` root,
/// [`SitemapError::MissingLoc`] for a `<url>` without a location,
/// [`SitemapError::Metadata`] or [`SitemapError::Link`] for malformed
/// entry metadata, and [`SitemapError::MisplacedPreamble`] for a
/// document-level `<rs:md>` or `<rs:ln>` after the first `<url>`.
pub fn read_xml(text: &str) -> Result<ResourceList, SitemapError> {
    let mut xot = Xot::new();
    let names = Names::new(&mut xot);

    let doc = xot.parse(text)?;
    let root = xot.document_element(doc)?;
    let root_name = match xot.element(root) {
        Some(element) => element.name(),
        None => return Err(SitemapError::NotSitemap(String::new())),
    };
    if root_name == names.sitemapindex {
        return Err(SitemapError::IsIndex);
    }
    if root_name != names.urlset {
        let (local, _) = xot.name_ns_str(root_name);
        return Err(SitemapError::NotSitemap(local.to_string()));
    }

    let mut list = ResourceList::new();
    let mut in_preamble = true;
    let children: Vec<Node> = xot.children(root).collect();
    for child in children {
        let Some(element) = xot.element(child) else {
            continue;
        };
        let name = element.name();
        if name == names.url {
            in_preamble = false;
            let resource = resource_from_url(&xot, &names, child)?;
            if let Err(err) = list.add(resource) {
                // First occurrence wins, matching the lenient read contract.
                tracing::warn!("skipping {err} while parsing sitemap");
            }
        } else if name == names.rs_md {
            if !in_preamble {
                return Err(SitemapError::MisplacedPreamble("md"));
            }
            if let Some(capability) = element.get_attribute(names.capability) {
                list.set_capability(capability.to_string());
            }
            if let Some(modified) = element.get_attribute(names.modified) {
                match Timestamp::parse(modified) {
                    Ok(ts) => list.set_modified(ts),
                    Err(err) => tracing::warn!("ignoring preamble modified value: {err}"),
                }
            }
        } else if name == names.rs_ln {
            if !in_preamble {
                return Err(SitemapError::MisplacedPreamble("ln"));
            }
            list.add_link(ln_from_element(&xot, &names, child, "preamble")?);
        }
    }
    Ok(list)
}

/// Build a [`Resource`] from one `<url>` element.
fn resource_from_url(xot: &Xot, names: &Names, url: Node) -> Result<Resource, SitemapError> {
    let mut loc = None;
    let mut lastmod = None;
    let mut md = None;
    let mut ln_nodes = Vec::new();
    for child in xot.children(url) {
        let Some(element) = xot.element(child) else {
            continue;
        };
        let name = element.name();
        if name == names.loc {
            loc = element_text(xot, child);
        } else if name == names.lastmod {
            lastmod = element_text(xot, child);
        } else if name == names.rs_md {
            md = Some(child);
        } else if name == names.rs_ln {
            ln_nodes.push(child);
        }
    }

    let uri = loc.ok_or(SitemapError::MissingLoc)?;
    let uri = uri.trim();
    let mut resource = Resource::new(uri).map_err(|_| SitemapError::MissingLoc)?;
    let metadata = |source: ResourceError| SitemapError::Metadata {
        uri: uri.to_string(),
        source,
    };

    if let Some(lastmod) = lastmod {
        resource.set_lastmod(lastmod.trim()).map_err(metadata)?;
    }
    if let Some(md) = md {
        if let Some(element) = xot.element(md) {
            if let Some(hash) = element.get_attribute(names.hash) {
                // Lenient decode: unknown algorithms are dropped inside.
                resource.set_hash(hash);
            }
            if let Some(length) = element.get_attribute(names.length) {
                resource.set_length_str(length).map_err(metadata)?;
            }
            if let Some(change) = element.get_attribute(names.change) {
                match Change::from_token(change) {
                    Some(change) => resource.set_change(change),
                    None => tracing::warn!("bad change attribute '{change}' for {uri}"),
                }
            }
            if let Some(capability) = element.get_attribute(names.capability) {
                resource.set_capability(capability.to_string());
            }
            if let Some(media_type) = element.get_attribute(names.media_type) {
                resource.set_media_type(media_type.to_string());
            }
        }
    }
    for node in ln_nodes {
        resource.add_link(ln_from_element(xot, names, node, uri)?);
    }
    Ok(resource)
}

/// Build an [`Ln`] from one `<rs:ln>` element.  `href` and `rel` are
/// mandatory; `length` and `pri` must parse when present.
fn ln_from_element(
    xot: &Xot,
    names: &Names,
    node: Node,
    context: &str,
) -> Result<Ln, SitemapError> {
    let link = |source: LnError| SitemapError::Link {
        context: context.to_string(),
        source,
    };
    let Some(element) = xot.element(node) else {
        return Err(link(LnError::EmptyHref));
    };
    let href = element
        .get_attribute(names.href)
        .ok_or_else(|| link(LnError::EmptyHref))?;
    let rel = element
        .get_attribute(names.rel)
        .ok_or_else(|| link(LnError::EmptyRel))?;
    let mut ln = Ln::new(href, rel).map_err(link)?;
    if let Some(hash) = element.get_attribute(names.hash) {
        ln.set_hash(hash);
    }
    if let Some(length) = element.get_attribute(names.length) {
        ln.set_length_str(length).map_err(link)?;
    }
    if let Some(modified) = element.get_attribute(names.modified) {
        match Timestamp::parse(modified) {
            Ok(ts) => ln.set_modified(ts),
            Err(err) => tracing::warn!("ignoring link modified value in {context}: {err}"),
        }
    }
    if let Some(pri) = element.get_attribute(names.pri) {
        ln.set_pri_str(pri).map_err(link)?;
    }
    if let Some(media_type) = element.get_attribute(names.media_type) {
        ln.set_media_type(media_type.to_string());
    }
    Ok(ln)
}

/// Render an [`Ln`] as an `<rs:ln>` element, attributes only.
fn ln_element(xot: &mut Xot, names: &Names, ln: &Ln) -> Node {
    let node = xot.new_element(names.rs_ln);
    set_attribute(xot, node, names.href, ln.href());
    set_attribute(xot, node, names.rel, ln.rel());
    let hash = ln.hash();
    if !hash.is_empty() {
        set_attribute(xot, node, names.hash, &hash);
    }
    if let Some(length) = ln.length() {
        set_attribute(xot, node, names.length, &length.to_string());
    }
    if let Some(modified) = ln.modified() {
        set_attribute(xot, node, names.modified, &modified.to_string());
    }
    if let Some(pri) = ln.pri() {
        set_attribute(xot, node, names.pri, &pri.to_string());
    }
    if let Some(media_type) = ln.media_type() {
        set_attribute(xot, node, names.media_type, media_type);
    }
    node
}

/// Set an attribute on an element node.
fn set_attribute(xot: &mut Xot, node: Node, name: NameId, value: &str) {
    if let Some(element) = xot.element_mut(node) {
        element.set_attribute(name, value);
    }
}

/// Concatenated text content of an element's direct children.
fn element_text(xot: &Xot, node: Node) -> Option<String> {
    let mut out = String::new();
    for child in xot.children(node) {
        if let xot::Value::Text(text) = xot.value(child) {
            out.push_str(text.get());
        }
    }
    if out.is_empty() { None } else { Some(out) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsx_schema::HashAlg;

    fn sample_list() -> ResourceList {
        let mut list = ResourceList::new().with_capability("resourcelist");
        let mut a = Resource::new("http://ex.org/a")
            .unwrap()
            .with_lastmod("2012-03-14T18:37:36Z")
            .unwrap()
            .with_length(12);
        a.set_md5("aaa");
        list.add(a).unwrap();
        list.add(Resource::new("http://ex.org/b").unwrap()).unwrap();
        list
    }

    #[test]
    fn test_roundtrip() {
        let xml = write_xml(&sample_list()).unwrap();
        let list = read_xml(&xml).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.capability(), Some("resourcelist"));
        let a = list.get("http://ex.org/a").unwrap();
        assert_eq!(a.lastmod().as_deref(), Some("2012-03-14T18:37:36Z"));
        assert_eq!(a.length(), Some(12));
        assert_eq!(a.digests().get(HashAlg::Md5), Some("aaa"));
        assert!(list.get("http://ex.org/b").unwrap().timestamp().is_none());
    }

    #[test]
    fn test_read_plain_sitemap() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <url><loc>http://ex.org/a</loc><lastmod>2012-01-01</lastmod></url>
            </urlset>"#;
        let list = read_xml(xml).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(
            list.get("http://ex.org/a").unwrap().lastmod().as_deref(),
            Some("2012-01-01T00:00:00Z")
        );
    }

    #[test]
    fn test_read_rs_md_attributes() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"
                             xmlns:rs="http://www.openarchives.org/rs/terms/">
              <rs:md capability="changelist" modified="2012-06-01T00:00:00Z"/>
              <url>
                <loc>http://ex.org/a</loc>
                <rs:md change="updated" hash="md5:ddd sha-512:ignored" length="7"/>
              </url>
            </urlset>"#;
        let list = read_xml(xml).unwrap();
        assert_eq!(list.capability(), Some("changelist"));
        assert!(list.modified().is_some());
        let a = list.get("http://ex.org/a").unwrap();
        assert_eq!(a.change(), Some(Change::Updated));
        assert_eq!(a.length(), Some(7));
        assert_eq!(a.hash(), "md5:ddd");
    }

    #[test]
    fn test_missing_loc_is_error() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <url><lastmod>2012-01-01</lastmod></url>
            </urlset>"#;
        assert!(matches!(read_xml(xml), Err(SitemapError::MissingLoc)));
    }

    #[test]
    fn test_bad_lastmod_is_error() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <url><loc>a</loc><lastmod>2012-13-01</lastmod></url>
            </urlset>"#;
        assert!(matches!(read_xml(xml), Err(SitemapError::Metadata { .. })));
    }

    #[test]
    fn test_sitemapindex_detected() {
        let xml = r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <sitemap><loc>http://ex.org/map1.xml</loc></sitemap>
            </sitemapindex>"#;
        assert!(matches!(read_xml(xml), Err(SitemapError::IsIndex)));
    }

    #[test]
    fn test_not_a_sitemap() {
        assert!(matches!(
            read_xml("<feed/>"),
            Err(SitemapError::NotSitemap(_))
        ));
    }

    #[test]
    fn test_links_roundtrip() {
        let mut list = sample_list();
        list.add_link(Ln::new("http://ex.org/dataset", "describedby").unwrap());
        {
            let a = list.get_mut("http://ex.org/a").unwrap();
            a.set_media_type("application/pdf");
            let mut ln = Ln::new("http://ex.org/a.html", "alternate").unwrap();
            ln.set_media_type("text/html");
            ln.set_length(3);
            ln.set_pri(2).unwrap();
            ln.set_hash("md5:bbb");
            a.add_link(ln);
        }

        let xml = write_xml(&list).unwrap();
        let back = read_xml(&xml).unwrap();
        assert_eq!(back.links(), list.links());
        let a = back.get("http://ex.org/a").unwrap();
        assert_eq!(a.media_type(), Some("application/pdf"));
        let ln = &a.links()[0];
        assert_eq!(ln.href(), "http://ex.org/a.html");
        assert_eq!(ln.rel(), "alternate");
        assert_eq!(ln.media_type(), Some("text/html"));
        assert_eq!(ln.length(), Some(3));
        assert_eq!(ln.pri(), Some(2));
        assert_eq!(ln.hash(), "md5:bbb");
        assert!(back.get("http://ex.org/b").unwrap().links().is_empty());
    }

    #[test]
    fn test_read_preamble_links() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"
                             xmlns:rs="http://www.openarchives.org/rs/terms/">
              <rs:md capability="resourcelist"/>
              <rs:ln href="http://ex.org/dataset" rel="describedby"/>
              <url><loc>http://ex.org/a</loc></url>
            </urlset>"#;
        let list = read_xml(xml).unwrap();
        assert_eq!(list.links().len(), 1);
        assert_eq!(list.links()[0].href(), "http://ex.org/dataset");
        assert_eq!(list.links()[0].rel(), "describedby");
    }

    #[test]
    fn test_md_after_first_url_is_error() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"
                             xmlns:rs="http://www.openarchives.org/rs/terms/">
              <url><loc>http://ex.org/a</loc></url>
              <rs:md capability="resourcelist"/>
            </urlset>"#;
        assert!(matches!(
            read_xml(xml),
            Err(SitemapError::MisplacedPreamble("md"))
        ));
    }

    #[test]
    fn test_ln_after_first_url_is_error() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"
                             xmlns:rs="http://www.openarchives.org/rs/terms/">
              <url><loc>http://ex.org/a</loc></url>
              <rs:ln href="http://ex.org/dataset" rel="describedby"/>
            </urlset>"#;
        assert!(matches!(
            read_xml(xml),
            Err(SitemapError::MisplacedPreamble("ln"))
        ));
    }

    #[test]
    fn test_ln_missing_rel_is_error() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"
                             xmlns:rs="http://www.openarchives.org/rs/terms/">
              <url>
                <loc>http://ex.org/a</loc>
                <rs:ln href="http://ex.org/a.html"/>
              </url>
            </urlset>"#;
        assert!(matches!(
            read_xml(xml),
            Err(SitemapError::Link {
                source: LnError::EmptyRel,
                ..
            })
        ));
    }

    #[test]
    fn test_ln_bad_pri_is_error() {
        for pri in ["0", "1000000", "abc"] {
            let xml = format!(
                r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"
                           xmlns:rs="http://www.openarchives.org/rs/terms/">
                  <url>
                    <loc>http://ex.org/a</loc>
                    <rs:ln href="http://ex.org/mirror" rel="duplicate" pri="{pri}"/>
                  </url>
                </urlset>"#
            );
            assert!(
                matches!(read_xml(&xml), Err(SitemapError::Link { .. })),
                "pri {pri}"
            );
        }
    }

    #[test]
    fn test_duplicate_uri_first_wins() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <url><loc>a</loc><lastmod>2012-01-01</lastmod></url>
              <url><loc>a</loc><lastmod>2013-01-01</lastmod></url>
            </urlset>"#;
        let list = read_xml(xml).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(
            list.get("a").unwrap().lastmod().as_deref(),
            Some("2012-01-01T00:00:00Z")
        );
    }
}
