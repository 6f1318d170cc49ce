//! RPC request/response types
//!
//! Typed values exchanged with the external RPC stub. Field layout follows
//! the HiveServer2 CLI service: tagged unions are modelled as structs of
//! optional members, exactly one of which the server populates.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Opaque server-issued identifier of an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle {
    pub guid: Vec<u8>,
    pub secret: Vec<u8>,
}

/// Kind of work an operation handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    ExecuteStatement,
    GetTypeInfo,
    GetCatalogs,
    GetSchemas,
    GetTables,
    GetTableTypes,
    GetColumns,
    GetFunctions,
    Unknown,
}

/// Opaque server-issued identifier of one statement or metadata request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationHandle {
    pub guid: Vec<u8>,
    pub secret: Vec<u8>,
    pub operation_type: OperationType,
    pub has_result_set: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    Success,
    SuccessWithInfo,
    StillExecuting,
    Error,
    InvalidHandle,
}

/// Status block carried by every response.
///
/// A populated `error_code` is what marks a failed request; `status_code`
/// alone is not consulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub status_code: StatusCode,
    pub sql_state: Option<String>,
    pub error_code: Option<i32>,
    pub error_message: Option<String>,
}

impl Status {
    pub fn success() -> Self {
        Self {
            status_code: StatusCode::Success,
            sql_state: None,
            error_code: None,
            error_message: None,
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::Error,
            sql_state: None,
            error_code: Some(code),
            error_message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolVersion {
    V1 = 0,
    V2 = 1,
    V3 = 2,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSessionReq {
    pub client_protocol: ProtocolVersion,
    pub username: Option<String>,
    pub password: Option<String>,
    pub configuration: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSessionResp {
    pub status: Status,
    pub server_protocol_version: ProtocolVersion,
    pub session_handle: Option<SessionHandle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteStatementReq {
    pub session_handle: SessionHandle,
    pub statement: String,
    pub conf_overlay: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteStatementResp {
    pub status: Status,
    pub operation_handle: Option<OperationHandle>,
}

/// Fetch direction. The client only ever requests `FetchNext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchOrientation {
    FetchNext,
    FetchPrior,
    FetchRelative,
    FetchAbsolute,
    FetchFirst,
    FetchLast,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResultsReq {
    pub operation_handle: OperationHandle,
    pub orientation: FetchOrientation,
    pub max_rows: i64,
}

impl FetchResultsReq {
    /// Next-chunk request for the given operation.
    pub fn next(operation_handle: OperationHandle, max_rows: usize) -> Self {
        Self {
            operation_handle,
            orientation: FetchOrientation::FetchNext,
            max_rows: i64::try_from(max_rows).unwrap_or(i64::MAX),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResultsResp {
    pub status: Status,
    pub has_more_rows: Option<bool>,
    pub results: Option<RowSet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetResultSetMetadataReq {
    pub operation_handle: OperationHandle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetResultSetMetadataResp {
    pub status: Status,
    pub schema: Option<TableSchema>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetSchemasReq {
    pub session_handle: SessionHandle,
    pub catalog_name: Option<String>,
    pub schema_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetSchemasResp {
    pub status: Status,
    pub operation_handle: Option<OperationHandle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseOperationReq {
    pub operation_handle: OperationHandle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseOperationResp {
    pub status: Status,
}

// ==================== Result set ====================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RowSet {
    pub start_row_offset: i64,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    pub col_vals: Vec<ColumnValue>,
}

/// Tagged value union. Each member wraps a possibly-null inner value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnValue {
    pub bool_val: Option<BoolValue>,
    pub byte_val: Option<ByteValue>,
    pub i16_val: Option<I16Value>,
    pub i32_val: Option<I32Value>,
    pub i64_val: Option<I64Value>,
    pub double_val: Option<DoubleValue>,
    pub string_val: Option<StringValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoolValue {
    pub value: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ByteValue {
    pub value: Option<i8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct I16Value {
    pub value: Option<i16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct I32Value {
    pub value: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct I64Value {
    pub value: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DoubleValue {
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StringValue {
    pub value: Option<String>,
}

impl ColumnValue {
    pub fn bool(v: bool) -> Self {
        Self {
            bool_val: Some(BoolValue { value: Some(v) }),
            ..Default::default()
        }
    }

    pub fn byte(v: i8) -> Self {
        Self {
            byte_val: Some(ByteValue { value: Some(v) }),
            ..Default::default()
        }
    }

    pub fn i16(v: i16) -> Self {
        Self {
            i16_val: Some(I16Value { value: Some(v) }),
            ..Default::default()
        }
    }

    pub fn i32(v: i32) -> Self {
        Self {
            i32_val: Some(I32Value { value: Some(v) }),
            ..Default::default()
        }
    }

    pub fn i64(v: i64) -> Self {
        Self {
            i64_val: Some(I64Value { value: Some(v) }),
            ..Default::default()
        }
    }

    pub fn double(v: f64) -> Self {
        Self {
            double_val: Some(DoubleValue { value: Some(v) }),
            ..Default::default()
        }
    }

    pub fn string(v: impl Into<String>) -> Self {
        Self {
            string_val: Some(StringValue {
                value: Some(v.into()),
            }),
            ..Default::default()
        }
    }
}

// ==================== Schema ====================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Vec<ColumnDesc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDesc {
    pub column_name: String,
    pub type_desc: TypeDesc,
    pub position: i32,
    pub comment: Option<String>,
}

/// Flattened type tree; entries reference each other by index.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeDesc {
    pub types: Vec<TypeEntry>,
}

impl TypeDesc {
    pub fn primitive(type_id: TypeId) -> Self {
        Self {
            types: vec![TypeEntry {
                primitive_entry: Some(PrimitiveTypeEntry {
                    type_id,
                    type_qualifiers: None,
                }),
                ..Default::default()
            }],
        }
    }
}

/// Tagged type union, one member populated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeEntry {
    pub primitive_entry: Option<PrimitiveTypeEntry>,
    pub array_entry: Option<ArrayTypeEntry>,
    pub map_entry: Option<MapTypeEntry>,
    pub struct_entry: Option<StructTypeEntry>,
    pub union_entry: Option<UnionTypeEntry>,
    pub user_defined_type_entry: Option<UserDefinedTypeEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimitiveTypeEntry {
    pub type_id: TypeId,
    pub type_qualifiers: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayTypeEntry {
    pub object_type_ptr: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapTypeEntry {
    pub key_type_ptr: i32,
    pub value_type_ptr: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructTypeEntry {
    pub name_to_type_ptr: BTreeMap<String, i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionTypeEntry {
    pub name_to_type_ptr: BTreeMap<String, i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDefinedTypeEntry {
    pub type_class_name: String,
}

/// Primitive type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeId {
    Boolean,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    String,
    Timestamp,
    Binary,
    Array,
    Map,
    Struct,
    Union,
    UserDefined,
    Decimal,
    Null,
    Date,
    Varchar,
    Char,
    IntervalYearMonth,
    IntervalDayTime,
}

impl TypeId {
    /// Protocol-level type name, e.g. `INT_TYPE`.
    pub fn name(&self) -> &'static str {
        match self {
            TypeId::Boolean => "BOOLEAN_TYPE",
            TypeId::TinyInt => "TINYINT_TYPE",
            TypeId::SmallInt => "SMALLINT_TYPE",
            TypeId::Int => "INT_TYPE",
            TypeId::BigInt => "BIGINT_TYPE",
            TypeId::Float => "FLOAT_TYPE",
            TypeId::Double => "DOUBLE_TYPE",
            TypeId::String => "STRING_TYPE",
            TypeId::Timestamp => "TIMESTAMP_TYPE",
            TypeId::Binary => "BINARY_TYPE",
            TypeId::Array => "ARRAY_TYPE",
            TypeId::Map => "MAP_TYPE",
            TypeId::Struct => "STRUCT_TYPE",
            TypeId::Union => "UNION_TYPE",
            TypeId::UserDefined => "USER_DEFINED_TYPE",
            TypeId::Decimal => "DECIMAL_TYPE",
            TypeId::Null => "NULL_TYPE",
            TypeId::Date => "DATE_TYPE",
            TypeId::Varchar => "VARCHAR_TYPE",
            TypeId::Char => "CHAR_TYPE",
            TypeId::IntervalYearMonth => "INTERVAL_YEAR_MONTH_TYPE",
            TypeId::IntervalDayTime => "INTERVAL_DAY_TIME_TYPE",
        }
    }
}

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
