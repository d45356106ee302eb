use strata_classfile::{
    parse_classfile, ConstantValue, ElementValue, Error, ParseOptions, ACC_FINAL, ACC_STATIC,
};

/// Assembles class file bytes directly, constant pool first.
#[derive(Default)]
struct ClassFileBuilder {
    pool: Vec<u8>,
    entry_count: u16,
    access_flags: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
    class_attributes: Vec<Vec<u8>>,
}

impl ClassFileBuilder {
    fn new() -> Self {
        Self::default()
    }

    fn push_entry(&mut self, tag: u8, payload: &[u8], slots: u16) -> u16 {
        self.pool.push(tag);
        self.pool.extend_from_slice(payload);
        let index = self.entry_count + 1;
        self.entry_count += slots;
        index
    }

    fn utf8_raw(&mut self, bytes: &[u8]) -> u16 {
        let mut payload = (bytes.len() as u16).to_be_bytes().to_vec();
        payload.extend_from_slice(bytes);
        self.push_entry(1, &payload, 1)
    }

    fn utf8(&mut self, s: &str) -> u16 {
        self.utf8_raw(s.as_bytes())
    }

    fn integer(&mut self, v: i32) -> u16 {
        self.push_entry(3, &v.to_be_bytes(), 1)
    }

    fn float(&mut self, v: f32) -> u16 {
        self.push_entry(4, &v.to_bits().to_be_bytes(), 1)
    }

    fn long(&mut self, v: i64) -> u16 {
        self.push_entry(5, &v.to_be_bytes(), 2)
    }

    fn double(&mut self, v: f64) -> u16 {
        self.push_entry(6, &v.to_bits().to_be_bytes(), 2)
    }

    fn class_ref(&mut self, name_index: u16) -> u16 {
        self.push_entry(7, &name_index.to_be_bytes(), 1)
    }

    fn class(&mut self, internal_name: &str) -> u16 {
        let name_index = self.utf8(internal_name);
        self.class_ref(name_index)
    }

    fn string_const(&mut self, s: &str) -> u16 {
        let utf8_index = self.utf8(s);
        self.push_entry(8, &utf8_index.to_be_bytes(), 1)
    }

    fn raw_entry(&mut self, tag: u8, payload: &[u8]) -> u16 {
        self.push_entry(tag, payload, 1)
    }

    fn set_class(&mut self, access_flags: u16, internal_name: &str) {
        self.access_flags = access_flags;
        self.this_class = self.class(internal_name);
    }

    fn set_super(&mut self, internal_name: &str) {
        self.super_class = self.class(internal_name);
    }

    fn implement(&mut self, internal_name: &str) {
        let index = self.class(internal_name);
        self.interfaces.push(index);
    }

    fn attribute(&mut self, name: &str, info: &[u8]) -> Vec<u8> {
        let name_index = self.utf8(name);
        let mut out = name_index.to_be_bytes().to_vec();
        out.extend_from_slice(&(info.len() as u32).to_be_bytes());
        out.extend_from_slice(info);
        out
    }

    fn constant_value_attribute(&mut self, value_index: u16) -> Vec<u8> {
        self.attribute("ConstantValue", &value_index.to_be_bytes())
    }

    fn field(&mut self, access_flags: u16, name: &str, descriptor: &str, attributes: &[Vec<u8>]) {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let mut out = Vec::new();
        out.extend_from_slice(&access_flags.to_be_bytes());
        out.extend_from_slice(&name_index.to_be_bytes());
        out.extend_from_slice(&descriptor_index.to_be_bytes());
        out.extend_from_slice(&(attributes.len() as u16).to_be_bytes());
        for attr in attributes {
            out.extend_from_slice(attr);
        }
        self.fields.push(out);
    }

    fn method(&mut self, access_flags: u16, name: &str, descriptor: &str, attributes: &[Vec<u8>]) {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let mut out = Vec::new();
        out.extend_from_slice(&access_flags.to_be_bytes());
        out.extend_from_slice(&name_index.to_be_bytes());
        out.extend_from_slice(&descriptor_index.to_be_bytes());
        out.extend_from_slice(&(attributes.len() as u16).to_be_bytes());
        for attr in attributes {
            out.extend_from_slice(attr);
        }
        self.methods.push(out);
    }

    fn annotation_bytes(&mut self, type_descriptor: &str, elements: &[(u16, Vec<u8>)]) -> Vec<u8> {
        let type_index = self.utf8(type_descriptor);
        let mut out = type_index.to_be_bytes().to_vec();
        out.extend_from_slice(&(elements.len() as u16).to_be_bytes());
        for (name_index, value) in elements {
            out.extend_from_slice(&name_index.to_be_bytes());
            out.extend_from_slice(value);
        }
        out
    }

    fn annotations_attribute(&mut self, annotations: &[Vec<u8>]) -> Vec<u8> {
        let mut info = (annotations.len() as u16).to_be_bytes().to_vec();
        for annotation in annotations {
            info.extend_from_slice(annotation);
        }
        self.attribute("RuntimeVisibleAnnotations", &info)
    }

    fn add_class_attribute(&mut self, attribute: Vec<u8>) {
        self.class_attributes.push(attribute);
    }

    fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFEBABEu32.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // minor
        out.extend_from_slice(&52u16.to_be_bytes()); // major (Java 8)
        out.extend_from_slice(&(self.entry_count + 1).to_be_bytes());
        out.extend_from_slice(&self.pool);
        out.extend_from_slice(&self.access_flags.to_be_bytes());
        out.extend_from_slice(&self.this_class.to_be_bytes());
        out.extend_from_slice(&self.super_class.to_be_bytes());
        out.extend_from_slice(&(self.interfaces.len() as u16).to_be_bytes());
        for index in &self.interfaces {
            out.extend_from_slice(&index.to_be_bytes());
        }
        out.extend_from_slice(&(self.fields.len() as u16).to_be_bytes());
        for field in &self.fields {
            out.extend_from_slice(field);
        }
        out.extend_from_slice(&(self.methods.len() as u16).to_be_bytes());
        for method in &self.methods {
            out.extend_from_slice(method);
        }
        out.extend_from_slice(&(self.class_attributes.len() as u16).to_be_bytes());
        for attr in &self.class_attributes {
            out.extend_from_slice(attr);
        }
        out
    }
}

fn element(tag: char, cp_index: u16) -> Vec<u8> {
    let mut out = vec![tag as u8];
    out.extend_from_slice(&cp_index.to_be_bytes());
    out
}

const ALL: ParseOptions = ParseOptions {
    field_info: true,
    static_final_constants: true,
    annotation_info: true,
};

#[test]
fn rejects_non_classfile_magic() {
    let err = parse_classfile(b"PK\x03\x04not a classfile", ParseOptions::default()).unwrap_err();
    assert!(err.is_not_a_classfile());
}

#[test]
fn truncated_input_is_eof_not_magic_error() {
    let mut builder = ClassFileBuilder::new();
    builder.set_class(0x0021, "com/example/Cut");
    builder.set_super("java/lang/Object");
    let bytes = builder.build();
    let err = parse_classfile(&bytes[..bytes.len() - 3], ParseOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Truncated));
    assert!(!err.is_not_a_classfile());
}

#[test]
fn parses_names_superclass_and_interfaces() {
    let mut builder = ClassFileBuilder::new();
    builder.set_class(0x0021, "com/example/Impl");
    builder.set_super("com/example/Base");
    builder.implement("java/io/Closeable");
    builder.implement("java/lang/Runnable");

    let record = parse_classfile(&builder.build(), ParseOptions::default()).unwrap();
    assert_eq!(record.fqn, "com.example.Impl");
    assert_eq!(record.superclass_fqn.as_deref(), Some("com.example.Base"));
    assert_eq!(
        record.interface_fqns,
        vec!["java.io.Closeable".to_string(), "java.lang.Runnable".to_string()]
    );
    assert!(!record.is_interface);
    assert!(!record.is_annotation);
}

#[test]
fn root_class_has_no_superclass() {
    let mut builder = ClassFileBuilder::new();
    builder.set_class(0x0021, "java/lang/Object");
    // super_class stays 0
    let record = parse_classfile(&builder.build(), ParseOptions::default()).unwrap();
    assert_eq!(record.superclass_fqn, None);
}

#[test]
fn interface_and_annotation_flags() {
    let mut builder = ClassFileBuilder::new();
    builder.set_class(0x2600, "com/example/Marker");
    builder.set_super("java/lang/Object");
    let record = parse_classfile(&builder.build(), ParseOptions::default()).unwrap();
    assert!(record.is_interface);
    assert!(record.is_annotation);
}

#[test]
fn resolves_forward_constant_pool_reference() {
    // The Class entry lands in the pool before the Utf8 it points at.
    let mut builder = ClassFileBuilder::new();
    let class_index = builder.class_ref(2);
    let name_index = builder.utf8("com/a/B");
    assert_eq!(class_index, 1);
    assert_eq!(name_index, 2);
    builder.access_flags = 0x0021;
    builder.this_class = class_index;
    builder.set_super("java/lang/Object");

    let record = parse_classfile(&builder.build(), ParseOptions::default()).unwrap();
    assert_eq!(record.fqn, "com.a.B");
}

#[test]
fn long_slot_ghost_does_not_shift_later_entries() {
    let mut builder = ClassFileBuilder::new();
    let long_index = builder.long(i64::MAX);
    builder.set_class(0x0021, "com/example/Wide");
    builder.set_super("java/lang/Object");
    let cv = builder.constant_value_attribute(long_index);
    builder.field(ACC_STATIC | ACC_FINAL, "BIG", "J", &[cv]);

    let record = parse_classfile(&builder.build(), ALL).unwrap();
    assert_eq!(record.fqn, "com.example.Wide");
    assert_eq!(record.static_final_constants.len(), 1);
    assert_eq!(
        record.static_final_constants[0].value,
        ConstantValue::Long(i64::MAX)
    );
}

#[test]
fn coerces_constants_per_field_descriptor() {
    let mut builder = ClassFileBuilder::new();
    builder.set_class(0x0021, "com/example/Constants");
    builder.set_super("java/lang/Object");

    let specs: &[(&str, &str)] = &[
        ("BYTE", "B"),
        ("CHAR", "C"),
        ("SHORT", "S"),
        ("FLAG", "Z"),
        ("INT", "I"),
        ("LONG", "J"),
        ("FLOAT", "F"),
        ("DOUBLE", "D"),
        ("TEXT", "Ljava/lang/String;"),
    ];
    for (name, descriptor) in specs {
        let value_index = match *descriptor {
            "B" => builder.integer(-7),
            "C" => builder.integer('x' as i32),
            "S" => builder.integer(-300),
            "Z" => builder.integer(1),
            "I" => builder.integer(123_456),
            "J" => builder.long(-5_000_000_000),
            "F" => builder.float(1.5),
            "D" => builder.double(-2.25),
            _ => builder.string_const("v"),
        };
        let cv = builder.constant_value_attribute(value_index);
        builder.field(ACC_STATIC | ACC_FINAL, name, descriptor, &[cv]);
    }

    let record = parse_classfile(&builder.build(), ALL).unwrap();
    let value_of = |name: &str| {
        record
            .static_final_constants
            .iter()
            .find(|c| c.field_name == name)
            .map(|c| c.value.clone())
            .unwrap()
    };
    assert_eq!(value_of("BYTE"), ConstantValue::Byte(-7));
    assert_eq!(value_of("CHAR"), ConstantValue::Char('x'));
    assert_eq!(value_of("SHORT"), ConstantValue::Short(-300));
    assert_eq!(value_of("FLAG"), ConstantValue::Boolean(true));
    assert_eq!(value_of("INT"), ConstantValue::Int(123_456));
    assert_eq!(value_of("LONG"), ConstantValue::Long(-5_000_000_000));
    assert_eq!(value_of("FLOAT"), ConstantValue::Float(1.5));
    assert_eq!(value_of("DOUBLE"), ConstantValue::Double(-2.25));
    assert_eq!(value_of("TEXT"), ConstantValue::Str("v".to_string()));
}

#[test]
fn constants_skipped_when_disabled_or_not_static_final() {
    let mut builder = ClassFileBuilder::new();
    builder.set_class(0x0021, "com/example/NoConst");
    builder.set_super("java/lang/Object");
    let static_only = builder.integer(1);
    let cv1 = builder.constant_value_attribute(static_only);
    builder.field(ACC_STATIC, "NOT_FINAL", "I", &[cv1]);
    let both = builder.integer(2);
    let cv2 = builder.constant_value_attribute(both);
    builder.field(ACC_STATIC | ACC_FINAL, "OK", "I", &[cv2]);

    let bytes = builder.build();
    let record = parse_classfile(&bytes, ALL).unwrap();
    assert_eq!(record.static_final_constants.len(), 1);
    assert_eq!(record.static_final_constants[0].field_name, "OK");

    let record = parse_classfile(&bytes, ParseOptions::default()).unwrap();
    assert!(record.static_final_constants.is_empty());
    assert!(record.fields.is_empty());
}

#[test]
fn methods_and_unknown_attributes_are_skipped_structurally() {
    let mut builder = ClassFileBuilder::new();
    builder.set_class(0x0021, "com/example/WithCode");
    builder.set_super("java/lang/Object");
    let fake_code = builder.attribute("Code", &[0xDE, 0xAD, 0xBE, 0xEF, 0x00]);
    builder.method(0x0001, "run", "()V", &[fake_code]);
    let unknown = builder.attribute("SourceFile", &[0, 1]);
    builder.add_class_attribute(unknown);

    let record = parse_classfile(&builder.build(), ParseOptions::default()).unwrap();
    assert_eq!(record.fqn, "com.example.WithCode");
}

#[test]
fn collects_runtime_visible_annotation_types() {
    let mut builder = ClassFileBuilder::new();
    builder.set_class(0x0021, "com/example/Annotated");
    builder.set_super("java/lang/Object");

    let count_name = builder.utf8("count");
    let count_value = builder.integer(3);
    let text_name = builder.utf8("text");
    let text_value = builder.utf8("hello");
    let enum_name = builder.utf8("color");
    let enum_type = builder.utf8("Lcom/example/Color;");
    let enum_const = builder.utf8("RED");
    let class_value = builder.utf8("Ljava/lang/String;");
    let class_name = builder.utf8("target");
    let nested = builder.annotation_bytes("Lcom/example/Inner;", &[]);
    let nested_name = builder.utf8("inner");
    let array_name = builder.utf8("values");

    let mut enum_value = vec![b'e'];
    enum_value.extend_from_slice(&enum_type.to_be_bytes());
    enum_value.extend_from_slice(&enum_const.to_be_bytes());

    let mut nested_value = vec![b'@'];
    nested_value.extend_from_slice(&nested);

    let mut array_value = vec![b'['];
    array_value.extend_from_slice(&2u16.to_be_bytes());
    array_value.extend_from_slice(&element('I', count_value));
    array_value.extend_from_slice(&element('I', count_value));

    let annotation = builder.annotation_bytes(
        "Lcom/example/Meta;",
        &[
            (count_name, element('I', count_value)),
            (text_name, element('s', text_value)),
            (enum_name, enum_value),
            (class_name, element('c', class_value)),
            (nested_name, nested_value),
            (array_name, array_value),
        ],
    );
    let plain = builder.annotation_bytes("Lcom/example/Tag;", &[]);
    let attr = builder.annotations_attribute(&[annotation, plain]);
    builder.add_class_attribute(attr);

    let bytes = builder.build();
    let record = parse_classfile(&bytes, ParseOptions::default()).unwrap();
    assert!(record.annotation_fqns.contains("com.example.Meta"));
    assert!(record.annotation_fqns.contains("com.example.Tag"));
    // Element values are traversed but not retained at default depth.
    assert!(record.annotations.is_empty());

    let record = parse_classfile(&bytes, ALL).unwrap();
    let meta = record
        .annotations
        .iter()
        .find(|a| a.type_fqn == "com.example.Meta")
        .unwrap();
    assert_eq!(meta.elements.len(), 6);
    assert!(meta
        .elements
        .iter()
        .any(|(name, value)| name == "count"
            && *value == ElementValue::Const(ConstantValue::Int(3))));
    assert!(meta.elements.iter().any(|(_, value)| matches!(
        value,
        ElementValue::EnumConst { type_fqn, const_name }
            if type_fqn == "com.example.Color" && const_name == "RED"
    )));
    assert!(meta
        .elements
        .iter()
        .any(|(_, value)| matches!(value, ElementValue::Array(items) if items.len() == 2)));
    assert!(meta
        .elements
        .iter()
        .any(|(_, value)| matches!(value, ElementValue::Nested(inner) if inner.type_fqn == "com.example.Inner")));
}

#[test]
fn malformed_element_value_tag_is_a_format_error() {
    let mut builder = ClassFileBuilder::new();
    builder.set_class(0x0021, "com/example/Bad");
    builder.set_super("java/lang/Object");
    let name = builder.utf8("x");
    let annotation = builder.annotation_bytes("Lcom/example/Meta;", &[(name, element('q', 1))]);
    let attr = builder.annotations_attribute(&[annotation]);
    builder.add_class_attribute(attr);

    let err = parse_classfile(&builder.build(), ParseOptions::default()).unwrap_err();
    assert!(matches!(err, Error::BadAnnotationValue { tag: b'q' }));
    assert!(!err.is_not_a_classfile());
}

#[test]
fn unknown_constant_pool_tag_is_a_format_error() {
    let mut builder = ClassFileBuilder::new();
    builder.raw_entry(2, &[]);
    builder.set_class(0x0021, "com/example/X");
    let err = parse_classfile(&builder.build(), ParseOptions::default()).unwrap_err();
    assert!(matches!(err, Error::BadPoolTag { tag: 2 }));
}

#[test]
fn decodes_modified_utf8_class_names() {
    let mut builder = ClassFileBuilder::new();
    // "com/example/Caf<U+00E9>" with the e-acute in two-byte form.
    let name_index = builder.utf8_raw(&[
        b'c', b'o', b'm', b'/', b'e', b'x', b'a', b'm', b'p', b'l', b'e', b'/', b'C', b'a', b'f',
        0xC3, 0xA9,
    ]);
    let class_index = builder.class_ref(name_index);
    builder.access_flags = 0x0021;
    builder.this_class = class_index;
    builder.set_super("java/lang/Object");

    let record = parse_classfile(&builder.build(), ParseOptions::default()).unwrap();
    assert_eq!(record.fqn, "com.example.Caf\u{e9}");
}

#[test]
fn duplicate_interface_declarations_are_preserved() {
    let mut builder = ClassFileBuilder::new();
    builder.set_class(0x0021, "com/example/Dup");
    builder.set_super("java/lang/Object");
    builder.implement("java/lang/Runnable");
    builder.implement("java/lang/Runnable");
    let record = parse_classfile(&builder.build(), ParseOptions::default()).unwrap();
    assert_eq!(record.interface_fqns.len(), 2);
}
