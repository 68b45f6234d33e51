//! Canned payloads for protocol benchmarks
//!
//! Bodies shaped like the responses of a service exposing an `AllTypes`
//! operation over REST-JSON and REST-XML, plus a JSON error document.

use crate::Result;
use crate::response::ResponseTemplate;

/// Path the protocol benchmarks post to
pub const ALL_TYPES_PATH: &str = "/2016-03-11/allTypes";

pub const XML_CONTENT_TYPE: &str = "application/xml";

pub const JSON_BODY: &str = r#"{"StringMember":"foo","IntegerMember":123,"BooleanMember":true,"FloatMember":123.0,"DoubleMember":123.9999,"LongMember":123,"SimpleList":["so simple"],"ListOfStructs":[{"StringMember":"listOfStructs1"}],"TimestampMember":1540982918.887,"StructWithNestedTimestampMember":{"NestedTimestamp":1540982918.908},"BlobArg":"aGVsbG8gd29ybGQ="}"#;

pub const XML_BODY: &str = r#"<AllTypesResponse><stringMember>foo</stringMember><integerMember>123</integerMember><booleanMember>true</booleanMember><floatMember>123.0</floatMember><doubleMember>123.9999</doubleMember><longMember>123</longMember><simpleList><member>so simple</member></simpleList><listOfStructs><member><StringMember>listOfStructs1</StringMember></member></listOfStructs><timestampMember>2018-10-31T10:51:12.302183Z</timestampMember><blobArg>aGVsbG8gd29ybGQ=</blobArg></AllTypesResponse>"#;

pub const ERROR_JSON_BODY: &str = r#"{"__type":"EmptyModeledException"}"#;

/// 200 with the JSON body, or the XML body for `application/xml` requests
pub fn json_xml_template() -> Result<ResponseTemplate> {
    ResponseTemplate::builder(200)
        .json(JSON_BODY)
        .alternate(XML_CONTENT_TYPE, XML_BODY)
        .build()
}

/// 500 with the JSON error body
pub fn error_template() -> Result<ResponseTemplate> {
    ResponseTemplate::builder(500)
        .header("x-amzn-ErrorType", "EmptyModeledException")
        .json(ERROR_JSON_BODY)
        .build()
}
