#![expect(missing_docs)]

use houio::{Attribute, ExportOptions, Geo, TextWriter, Value, Writer, read_document, write_value};

mod common;

#[test]
fn snapshot_saved_point_cloud_events() {
    let mut geo = Geo::new();
    geo.point_count = 1;
    geo.vertex_count = 1;
    geo.topology = vec![0];
    geo.point_attributes.insert(
        "P".into(),
        Attribute::numeric("P", 4, vec![1.0_f32, 2.0, 3.0, 1.0]).unwrap(),
    );
    let bytes = geo.save(Vec::new(), ExportOptions::default()).unwrap();

    insta::assert_snapshot!(common::log(&bytes), @r"
    begin array
      string pointcount
      int 1
      string vertexcount
      int 1
      string primitivecount
      int 0
      string topology
      begin array
        string pointref
        begin array
          string indices
          uniform int16[1] 0
        end array
      end array
      string attributes
      begin array
        string pointattributes
        begin array
          begin array
            begin array
              string name
              string P
              string type
              string numeric
            end array
            begin array
              string size
              int 4
              string storage
              string fpreal32
              string values
              begin array
                string size
                int 4
                string storage
                string fpreal32
                string pagesize
                int 1024
                string rawpagedata
                uniform real32[4] 1.0 2.0 3.0 1.0
              end array
            end array
          end array
        end array
      end array
    end array
    ");
}

#[test]
fn snapshot_text_writer_layout() {
    let doc = read_document(&br#"{"b": "x", "a": [1, 2.5]}"#[..]).unwrap();
    let mut writer = TextWriter::new(Vec::new());
    write_value(&mut writer, &doc).unwrap();
    writer.finish().unwrap();
    let text = String::from_utf8(writer.into_inner()).unwrap().replace('\t', "  ");

    insta::assert_snapshot!(text, @r#"
    {
      "a":
      [
        1,
        2.5
      ],
      "b":"x"
    }
    "#);
    assert_eq!(read_document(text.as_bytes()).unwrap(), doc);
}

#[test]
fn snapshot_text_event_log() {
    let log = common::log(common::TEXT_GEO.as_bytes());
    let head = log.lines().take(12).collect::<Vec<_>>().join("\n");
    insta::assert_snapshot!(head, @r"
    begin array
      string pointcount
      int 4
      string vertexcount
      int 5
      string primitivecount
      int 3
      string topology
      begin array
        string pointref
        begin array
          string indices
    ");
}

#[test]
fn value_display_is_compact() {
    let doc = Value::from(vec![Value::Int(1), Value::from("a"), Value::Null]);
    assert_eq!(doc.to_string(), r#"[1,"a",null]"#);
}
