//! The public read model of stored content.
//!
//! Content is stored in the shape its producers publish it in. Reads answer with a
//! different shape: a public `id`, a resolved `type`, API links for referenced content,
//! and de-duplicated, sorted `identifiers`, `brands` and `members`. Absent or null source
//! fields are left out of the result.
//!
//! | Stored                         | Read                              |
//! |--------------------------------|-----------------------------------|
//! | `uuid`                         | `id` = `http://www.ft.com/thing/<uuid>` |
//! | `body` / `opening`             | `bodyXML` / `openingXML`          |
//! | `brands[].id`                  | `brands[]` (sorted set of ids)    |
//! | `mainImage` (uuid)             | `mainImage.id` = API link         |
//! | `members[].uuid`               | `members[].id` = API links        |
//! | `externalBinaryUrl`            | `binaryUrl`                       |
//! | `lastModified`                 | `lastModified`                    |

use std::{collections::BTreeSet, sync::Arc};

use bson::{Bson, Document};

use crate::{
    document::{DocumentExt, fields},
    transform::UriResolver,
};

/// Prefix of the public `id` of a piece of content.
pub const CONTENT_ID_PREFIX: &str = "http://www.ft.com/thing/";

const BODY: &str = "body";
const OPENING: &str = "opening";
const OPENING_XML: &str = "openingXML";
const TYPE: &str = "type";
const BRANDS: &str = "brands";
const MAIN_IMAGE: &str = "mainImage";
const MEMBERS: &str = "members";
const INTERNAL_BINARY_URL: &str = "internalBinaryUrl";
const EXTERNAL_BINARY_URL: &str = "externalBinaryUrl";
const BINARY_URL: &str = "binaryUrl";

/// Fields copied unchanged, in read-model order.
const HEAD_FIELDS: &[&str] = &["title", "standfirst", "byline", "description", "publishedDate"];
const TAIL_FIELDS: &[&str] = &[
    "comments",
    "standout",
    "realtime",
    "publishReference",
    "lastModified",
    "copyright",
    "alternativeTitles",
];

/// The kind of a piece of content, derived from which fields it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Article,
    ImageSet,
    MediaResource,
}

impl ContentType {
    /// Binaries make a media resource, members make an image set, anything else is an article.
    pub fn resolve(content: &Document) -> Self {
        if content.non_empty_str(EXTERNAL_BINARY_URL).is_some()
            || content.non_empty_str(INTERNAL_BINARY_URL).is_some()
        {
            ContentType::MediaResource
        } else if matches!(content.get(MEMBERS), Some(Bson::Array(members)) if !members.is_empty()) {
            ContentType::ImageSet
        } else {
            ContentType::Article
        }
    }

    pub fn uri(self) -> &'static str {
        match self {
            ContentType::Article => "http://www.ft.com/ontology/content/Article",
            ContentType::ImageSet => "http://www.ft.com/ontology/content/ImageSet",
            ContentType::MediaResource => "http://www.ft.com/ontology/content/MediaResource",
        }
    }
}

/// Maps stored content onto its read model.
#[derive(Debug, Clone)]
pub struct ContentMapper {
    resolver: Arc<dyn UriResolver>,
}

impl ContentMapper {
    pub fn new(resolver: Arc<dyn UriResolver>) -> Self {
        Self { resolver }
    }

    /// Builds the read model of `stored`. Fields the read model does not know are dropped.
    pub fn map(&self, stored: &Document) -> Document {
        let mut read = Document::new();

        if let Some(uuid) = stored.non_empty_str(fields::UUID) {
            read.insert(fields::ID, format!("{CONTENT_ID_PREFIX}{uuid}"));
        }
        read.insert(TYPE, ContentType::resolve(stored).uri());

        copy_first(stored, &mut read, &[BODY, fields::BODY_XML], fields::BODY_XML);
        copy_first(stored, &mut read, &[OPENING, OPENING_XML], OPENING_XML);
        for &field in HEAD_FIELDS {
            copy_first(stored, &mut read, &[field], field);
        }

        if let Some(identifiers) = identifiers(stored) {
            read.insert(fields::IDENTIFIERS, identifiers);
        }
        if let Some(members) = self.members(stored) {
            read.insert(MEMBERS, members);
        }
        copy_first(stored, &mut read, &[EXTERNAL_BINARY_URL], BINARY_URL);
        copy_first(stored, &mut read, &["pixelWidth"], "pixelWidth");
        copy_first(stored, &mut read, &["pixelHeight"], "pixelHeight");
        if let Some(brands) = brands(stored) {
            read.insert(BRANDS, brands);
        }
        if let Some(image) = stored.non_empty_str(MAIN_IMAGE) {
            read.insert(MAIN_IMAGE, self.content_link(image));
        }
        for &field in TAIL_FIELDS {
            copy_first(stored, &mut read, &[field], field);
        }

        read
    }

    fn content_link(&self, uuid: &str) -> Document {
        let mut link = Document::new();
        link.insert(fields::ID, self.resolver.resolve(&format!("/content/{uuid}")));
        link
    }

    fn members(&self, stored: &Document) -> Option<Bson> {
        let Some(Bson::Array(members)) = stored.get(MEMBERS) else {
            return None;
        };

        let uuids: BTreeSet<&str> = members
            .iter()
            .filter_map(|member| match member {
                Bson::Document(member) => member.non_empty_str(fields::UUID),
                Bson::String(uuid) if !uuid.is_empty() => Some(uuid.as_str()),
                _ => None,
            })
            .collect();

        Some(Bson::Array(
            uuids
                .into_iter()
                .map(|uuid| Bson::Document(self.content_link(uuid)))
                .collect(),
        ))
    }
}

fn copy_first(stored: &Document, read: &mut Document, sources: &[&str], target: &str) {
    let value = sources
        .iter()
        .filter_map(|source| stored.get(*source))
        .find(|value| !matches!(value, Bson::Null));

    if let Some(value) = value {
        read.insert(target, value.clone());
    }
}

fn identifiers(stored: &Document) -> Option<Bson> {
    let Some(Bson::Array(identifiers)) = stored.get(fields::IDENTIFIERS) else {
        return None;
    };

    let pairs: BTreeSet<(&str, &str)> = identifiers
        .iter()
        .filter_map(Bson::as_document)
        .filter_map(|identifier| {
            Some((
                identifier.non_empty_str(fields::AUTHORITY)?,
                identifier.non_empty_str(fields::IDENTIFIER_VALUE)?,
            ))
        })
        .collect();

    Some(Bson::Array(
        pairs
            .into_iter()
            .map(|(authority, value)| {
                let mut identifier = Document::new();
                identifier.insert(fields::AUTHORITY, authority);
                identifier.insert(fields::IDENTIFIER_VALUE, value);
                Bson::Document(identifier)
            })
            .collect(),
    ))
}

fn brands(stored: &Document) -> Option<Bson> {
    let Some(Bson::Array(brands)) = stored.get(BRANDS) else {
        return None;
    };

    let ids: BTreeSet<&str> = brands
        .iter()
        .filter_map(|brand| match brand {
            Bson::Document(brand) => brand.non_empty_str(fields::ID),
            Bson::String(id) if !id.is_empty() => Some(id.as_str()),
            _ => None,
        })
        .collect();

    Some(Bson::Array(ids.into_iter().map(Bson::from).collect()))
}
