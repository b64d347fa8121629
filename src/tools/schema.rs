//! 工具参数 JSON Schema 生成（schemars 自动生成）
//!
//! 工具输入类型派生 JsonSchema，这里转成 function calling 需要的 parameters 对象。

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde_json::Value;

/// 生成参数 schema：内联子类型，去掉 `$schema` 与 `title` 元信息
pub fn args_schema<T: JsonSchema>() -> Value {
    let settings = SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
        s.meta_schema = None;
    });
    let schema = settings.into_generator().into_root_schema_for::<T>();
    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({"type": "object"}));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("title");
        obj.remove("$schema");
        obj.remove("definitions");
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct LookupArgs {
        /// 查询键
        key: String,
    }

    #[test]
    fn test_args_schema_shape() {
        let schema = args_schema::<LookupArgs>();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], serde_json::json!(["key"]));
        assert_eq!(schema["properties"]["key"]["description"], "查询键");
        assert!(schema.get("$schema").is_none());
        assert!(schema.get("title").is_none());
    }
}
