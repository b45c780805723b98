//! Widget Codec Example
//!
//! Registers two wire types (Widget, Color), decodes a few payloads —
//! including ones that fail validation or name an unknown tag — and encodes
//! a typed value back into tagged JSON.

use std::any::Any;

use tagwire_codec::{
    Decoded, Decoder, Encoder, FieldAccess, FieldMap, FieldRule, Registry, Schema, WireObject,
    WireType,
};

#[derive(Debug, Clone)]
struct Color {
    name: String,
}

impl WireObject for Color {
    fn wire_fields(&self) -> FieldMap {
        FieldMap::from([("name".to_string(), Decoded::from(self.name.clone()))])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Clone)]
struct Widget {
    kind: String,
    colors: Vec<Color>,
    row_id: Option<String>,
}

impl WireObject for Widget {
    fn wire_fields(&self) -> FieldMap {
        FieldMap::from([
            ("kind".to_string(), Decoded::from(self.kind.clone())),
            (
                "colors".to_string(),
                Decoded::List(self.colors.iter().cloned().map(Decoded::object).collect()),
            ),
            ("row_id".to_string(), Decoded::from(self.row_id.clone())),
        ])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn main() {
    let registry = Registry::new();
    registry
        .register(
            WireType::new("Color", |mut fields: FieldMap| {
                Ok(Color {
                    name: fields.take_string("name")?,
                })
            })
            .with_schema(Schema::new().field("name", FieldRule::string_max(80))),
        )
        .expect("register Color");
    registry
        .register(
            WireType::new("Widget", |mut fields: FieldMap| {
                Ok(Widget {
                    kind: fields.take_string("kind")?,
                    colors: fields.take_objects("colors")?,
                    row_id: None,
                })
            })
            .with_schema(
                Schema::new()
                    .field("kind", FieldRule::string_max(80))
                    .field("colors", FieldRule::list(FieldRule::ensure_type("Color"))),
            )
            // Storage handle, never on the wire.
            .suppress("row_id"),
        )
        .expect("register Widget");

    let decoder = Decoder::new(&registry);
    let encoder = Encoder::new(&registry);

    let payloads = [
        r#"{"__type__": "Widget", "kind": "spinner",
            "colors": [{"__type__": "Color", "name": "red"}]}"#,
        r#"{"__type__": "Widget", "kind": 7, "colors": [{"name": "red"}]}"#, // fails validation
        r#"{"__type__": "Gadget", "kind": "spinner"}"#,                      // unknown tag
    ];

    for payload in payloads {
        println!("--- decoding {payload}");
        match decoder.loader(payload.as_bytes()) {
            Ok(value) => println!("decoded: {value:?}"),
            Err(err) => println!("rejected: {err}"),
        }
    }

    let widget = Widget {
        kind: "spinner".to_string(),
        colors: vec![Color {
            name: "red".to_string(),
        }],
        row_id: Some("row-17".to_string()),
    };
    let json = encoder
        .dumper(&Decoded::object(widget))
        .expect("encode widget");
    println!("--- encoded (row_id suppressed): {json}");
}
