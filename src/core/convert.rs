//! Conversion of a managed resource into the exported schema.
//!
//! Literal HCL values map to JSON values; anything that needs evaluation
//! (references, function calls, operations, conditionals, for-expressions)
//! is kept as an interpolation string such as `"${var.name}"`. Nested
//! blocks become arrays of objects keyed by block type.

use super::error::ConversionError;
use super::path::display_relative;
use super::types::{ManagedResource, ModulePath, OutputResourceConfig, ResourceBody};
use hcl::{Body, Expression, ObjectKey, TemplateExpr};
use serde_json::{Map, Value};
use std::path::Path;

/// Where a resource sits, for fields that depend on the graph.
#[derive(Debug, Clone, Copy)]
pub struct ConvertContext<'a> {
    /// Absolute root directory of the load
    pub root_dir: &'a Path,
    /// Module declaring the resource
    pub module_path: &'a ModulePath,
}

/// Turns one internal resource into an [`OutputResourceConfig`].
pub trait ResourceConverter {
    fn convert(
        &self,
        resource: &ManagedResource,
        ctx: &ConvertContext<'_>,
    ) -> Result<OutputResourceConfig, ConversionError>;
}

/// Default converter: body rendered as a JSON object.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConverter;

impl ResourceConverter for JsonConverter {
    fn convert(
        &self,
        resource: &ManagedResource,
        ctx: &ConvertContext<'_>,
    ) -> Result<OutputResourceConfig, ConversionError> {
        let config = match &resource.body {
            ResourceBody::Hcl(body) => Value::Object(body_to_json(body)?),
            ResourceBody::Json(map) => Value::Object(map.clone()),
        };
        Ok(OutputResourceConfig {
            id: resource.address(),
            name: resource.name.clone(),
            resource_type: resource.resource_type.clone(),
            source: display_relative(&resource.file, ctx.root_dir),
            line: resource.line,
            module_path: ctx.module_path.to_string(),
            config,
        })
    }
}

/// Convert an HCL body into a JSON object.
pub fn body_to_json(body: &Body) -> Result<Map<String, Value>, ConversionError> {
    let mut map = Map::new();

    for attr in body.attributes() {
        map.insert(attr.key().to_string(), expr_to_json(attr.expr())?);
    }

    for block in body.blocks() {
        let kind = block.identifier();
        let mut value = Value::Object(body_to_json(block.body())?);
        // Labelled nested blocks nest by label: `provisioner "local-exec" {}`
        for label in block.labels().iter().rev() {
            let mut wrapper = Map::new();
            wrapper.insert(label.as_str().to_string(), value);
            value = Value::Object(wrapper);
        }

        match map.get_mut(kind) {
            None => {
                map.insert(kind.to_string(), Value::Array(vec![value]));
            }
            Some(Value::Array(items)) if !body.attributes().any(|a| a.key() == kind) => {
                items.push(value);
            }
            Some(_) => {
                return Err(ConversionError::new(format!(
                    "'{}' is used both as an argument and as a block",
                    kind
                )));
            }
        }
    }

    Ok(map)
}

/// Convert one HCL expression into JSON.
pub fn expr_to_json(expr: &Expression) -> Result<Value, ConversionError> {
    let value = match expr {
        Expression::Null => Value::Null,
        Expression::Bool(b) => Value::Bool(*b),
        Expression::Number(n) => serde_json::to_value(n)
            .map_err(|e| ConversionError::new(format!("invalid number {}: {}", n, e)))?,
        Expression::String(s) => Value::String(s.clone()),
        Expression::Array(items) => Value::Array(
            items
                .iter()
                .map(expr_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Expression::Object(object) => {
            let mut map = Map::new();
            for (key, value) in object.iter() {
                map.insert(object_key_to_string(key)?, expr_to_json(value)?);
            }
            Value::Object(map)
        }
        Expression::TemplateExpr(template) => Value::String(template_to_string(template)?),
        other => Value::String(format!("${{{}}}", render_expr(other)?)),
    };
    Ok(value)
}

fn template_to_string(template: &TemplateExpr) -> Result<String, ConversionError> {
    match template {
        TemplateExpr::QuotedString(s) => Ok(s.clone()),
        TemplateExpr::Heredoc(heredoc) => Ok(heredoc.template.clone()),
        #[allow(unreachable_patterns)]
        _ => Err(ConversionError::new("unsupported template expression")),
    }
}

fn object_key_to_string(key: &ObjectKey) -> Result<String, ConversionError> {
    match key {
        ObjectKey::Identifier(ident) => Ok(ident.to_string()),
        ObjectKey::Expression(Expression::String(s)) => Ok(s.clone()),
        ObjectKey::Expression(expr) => Ok(format!("${{{}}}", render_expr(expr)?)),
        #[allow(unreachable_patterns)]
        _ => Err(ConversionError::new("unsupported object key")),
    }
}

/// Render an expression back to HCL source text.
pub fn render_expr(expr: &Expression) -> Result<String, ConversionError> {
    hcl::format::to_string(expr)
        .map_err(|e| ConversionError::new(format!("cannot render expression: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ResourceMode;
    use serde_json::json;
    use std::path::PathBuf;

    fn hcl_resource(src: &str) -> ManagedResource {
        let body = hcl::parse(src).unwrap();
        ManagedResource {
            mode: ResourceMode::Managed,
            resource_type: "aws_instance".to_string(),
            name: "web".to_string(),
            body: ResourceBody::Hcl(body),
            file: PathBuf::from("/proj/modules/web/main.tf"),
            line: 4,
        }
    }

    #[test]
    fn test_convert_literals() {
        let r = hcl_resource(
            r#"
ami           = "ami-123"
count         = 2
ebs_optimized = true
tags          = { Name = "web", "Team" = "infra" }
zones         = ["a", "b"]
"#,
        );
        let root = ModulePath::root().child("web");
        let ctx = ConvertContext {
            root_dir: Path::new("/proj"),
            module_path: &root,
        };
        let out = JsonConverter.convert(&r, &ctx).unwrap();
        assert_eq!(out.id, "aws_instance.web");
        assert_eq!(out.source, "modules/web/main.tf");
        assert_eq!(out.module_path, "web");
        assert_eq!(out.line, 4);
        assert_eq!(out.config["ami"], json!("ami-123"));
        assert_eq!(out.config["count"], json!(2));
        assert_eq!(out.config["ebs_optimized"], json!(true));
        assert_eq!(out.config["tags"], json!({"Name": "web", "Team": "infra"}));
        assert_eq!(out.config["zones"], json!(["a", "b"]));
    }

    #[test]
    fn test_convert_references_become_interpolations() {
        let r = hcl_resource("subnet_id = var.subnet_id\n");
        let out = JsonConverter
            .convert(
                &r,
                &ConvertContext {
                    root_dir: Path::new("/proj"),
                    module_path: &ModulePath::root(),
                },
            )
            .unwrap();
        let rendered = out.config["subnet_id"].as_str().unwrap();
        assert!(rendered.starts_with("${"));
        assert!(rendered.contains("var.subnet_id"));
    }

    #[test]
    fn test_convert_templates_keep_raw_text() {
        let body = hcl::parse(
            r#"
name      = "web-${var.env}"
user_data = <<EOT
#!/bin/sh
echo ${var.greeting}
EOT
"#,
        )
        .unwrap();
        let map = body_to_json(&body).unwrap();
        assert_eq!(map["name"], json!("web-${var.env}"));
        assert_eq!(
            map["user_data"].as_str().unwrap().trim_end(),
            "#!/bin/sh\necho ${var.greeting}"
        );
    }

    #[test]
    fn test_convert_nested_blocks_repeat() {
        let body = hcl::parse(
            r#"
name = "sg"
ingress {
  from_port = 22
}
ingress {
  from_port = 443
}
"#,
        )
        .unwrap();
        let map = body_to_json(&body).unwrap();
        assert_eq!(
            map["ingress"],
            json!([{"from_port": 22}, {"from_port": 443}])
        );
    }

    #[test]
    fn test_convert_labelled_block() {
        let body = hcl::parse(
            r#"
provisioner "local-exec" {
  command = "echo hi"
}
"#,
        )
        .unwrap();
        let map = body_to_json(&body).unwrap();
        assert_eq!(
            map["provisioner"],
            json!([{"local-exec": {"command": "echo hi"}}])
        );
    }

    #[test]
    fn test_convert_argument_block_clash_fails() {
        let body = hcl::parse(
            r#"
lifecycle = true
lifecycle {
  create_before_destroy = true
}
"#,
        )
        .unwrap();
        let err = body_to_json(&body).unwrap_err();
        assert!(err.message.contains("lifecycle"));
    }

    #[test]
    fn test_convert_json_body_passthrough() {
        let mut map = Map::new();
        map.insert("bucket".to_string(), json!("${var.name}"));
        let r = ManagedResource {
            mode: ResourceMode::Managed,
            resource_type: "aws_s3_bucket".to_string(),
            name: "b".to_string(),
            body: ResourceBody::Json(map),
            file: PathBuf::from("/proj/main.tf.json"),
            line: 0,
        };
        let out = JsonConverter
            .convert(
                &r,
                &ConvertContext {
                    root_dir: Path::new("/proj"),
                    module_path: &ModulePath::root(),
                },
            )
            .unwrap();
        assert_eq!(out.source, "main.tf.json");
        assert_eq!(out.config, json!({"bucket": "${var.name}"}));
    }
}
