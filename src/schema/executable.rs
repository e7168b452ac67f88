//! Executable schema compiled from SDL type definitions and a resolver map.

use async_graphql::dynamic::{
    DynamicRequestExt, Enum, EnumItem, Field, FieldFuture, FieldValue, InputObject, InputValue,
    Object, ResolverContext, Scalar, Schema, TypeRef,
};
use async_graphql::{Name, PathSegment, Request, ServerError, Value as GraphQLValue, Variables};
use async_trait::async_trait;
use graphql_parser::schema::{
    self as sdl, parse_schema, Definition, TypeDefinition, TypeExtension,
};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::context::ExecutionContext;
use crate::error::{GatewayError, SchemaError};
use crate::schema::resolvers::{default_resolve, Resolver, ResolverArgs, Resolvers};
use crate::schema::{EngineRequest, ErrorLocation, QueryEngine, QueryError, QueryResponse};

const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// Compiled schema backed by the `async-graphql` dynamic executor.
pub struct ExecutableSchema {
    schema: Schema,
}

struct RootTypes {
    query: String,
    mutation: Option<String>,
    subscription: Option<String>,
}

impl RootTypes {
    fn from_document(document: &sdl::Document<'_, String>, objects: &HashSet<String>) -> Self {
        let explicit = document.definitions.iter().find_map(|definition| match definition {
            Definition::SchemaDefinition(schema) => Some(schema),
            _ => None,
        });
        match explicit {
            Some(schema) => Self {
                query: schema.query.clone().unwrap_or_else(|| "Query".to_string()),
                mutation: schema.mutation.clone(),
                subscription: schema.subscription.clone(),
            },
            None => Self {
                query: "Query".to_string(),
                mutation: objects.contains("Mutation").then(|| "Mutation".to_string()),
                subscription: objects
                    .contains("Subscription")
                    .then(|| "Subscription".to_string()),
            },
        }
    }
}

impl ExecutableSchema {
    /// Compile `type_defs` and attach `resolvers`.
    ///
    /// Object, input object, enum and scalar definitions are supported.
    /// Interfaces, unions and type extensions are rejected. Subscription roots
    /// are skipped.
    pub fn new(type_defs: &str, resolvers: Resolvers) -> Result<Self, SchemaError> {
        let document =
            parse_schema::<String>(type_defs).map_err(|e| SchemaError::Parse(e.to_string()))?;

        let mut objects = HashSet::new();
        let mut enums = HashSet::new();
        for definition in &document.definitions {
            match definition {
                Definition::TypeDefinition(TypeDefinition::Object(object)) => {
                    objects.insert(object.name.clone());
                }
                Definition::TypeDefinition(TypeDefinition::Enum(enum_type)) => {
                    enums.insert(enum_type.name.clone());
                }
                _ => {}
            }
        }
        let roots = RootTypes::from_document(&document, &objects);
        if !objects.contains(&roots.query) {
            return Err(SchemaError::MissingQueryType(roots.query));
        }
        let enums = Arc::new(enums);

        let mut known_fields = HashSet::new();
        let mut builder = Schema::build(&roots.query, roots.mutation.as_deref(), None);
        for definition in &document.definitions {
            match definition {
                Definition::SchemaDefinition(_) => {}
                Definition::DirectiveDefinition(directive) => {
                    debug!(directive = %directive.name, "Ignoring directive definition");
                }
                Definition::TypeExtension(extension) => {
                    return Err(SchemaError::Unsupported {
                        kind: "type extension",
                        name: extension_name(extension),
                    });
                }
                Definition::TypeDefinition(type_definition) => match type_definition {
                    TypeDefinition::Object(object) => {
                        if roots.subscription.as_deref() == Some(object.name.as_str()) {
                            warn!(type_name = %object.name, "Subscription root is not executable; skipping");
                            continue;
                        }
                        for field in &object.fields {
                            known_fields.insert((object.name.clone(), field.name.clone()));
                        }
                        builder = builder.register(build_object(object, &resolvers, &enums));
                    }
                    TypeDefinition::Scalar(scalar) => {
                        if !BUILTIN_SCALARS.contains(&scalar.name.as_str()) {
                            builder = builder.register(Scalar::new(scalar.name.clone()));
                        }
                    }
                    TypeDefinition::Enum(enum_type) => {
                        let built = enum_type
                            .values
                            .iter()
                            .fold(Enum::new(enum_type.name.clone()), |built, value| {
                                built.item(EnumItem::new(value.name.clone()))
                            });
                        builder = builder.register(built);
                    }
                    TypeDefinition::InputObject(input) => {
                        let built = input
                            .fields
                            .iter()
                            .fold(InputObject::new(input.name.clone()), |built, field| {
                                built.field(InputValue::new(
                                    field.name.clone(),
                                    type_ref(&field.value_type),
                                ))
                            });
                        builder = builder.register(built);
                    }
                    TypeDefinition::Interface(interface) => {
                        return Err(SchemaError::Unsupported {
                            kind: "interface",
                            name: interface.name.clone(),
                        });
                    }
                    TypeDefinition::Union(union) => {
                        return Err(SchemaError::Unsupported {
                            kind: "union",
                            name: union.name.clone(),
                        });
                    }
                },
            }
        }

        for (type_name, field_name) in resolvers.keys() {
            if !known_fields.contains(&(type_name.to_string(), field_name.to_string())) {
                return Err(SchemaError::UnknownResolver {
                    type_name: type_name.to_string(),
                    field_name: field_name.to_string(),
                });
            }
        }

        let schema = builder
            .finish()
            .map_err(|e| SchemaError::Build(e.to_string()))?;
        Ok(Self { schema })
    }

    /// Printed SDL of the compiled schema.
    pub fn sdl(&self) -> String {
        self.schema.sdl()
    }
}

impl fmt::Debug for ExecutableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutableSchema").finish_non_exhaustive()
    }
}

#[async_trait]
impl QueryEngine for ExecutableSchema {
    async fn execute(&self, request: EngineRequest) -> Result<QueryResponse, GatewayError> {
        let EngineRequest {
            query,
            variables,
            context,
            operation_name,
            root_value,
        } = request;

        let root =
            GraphQLValue::from_json(root_value).map_err(|e| GatewayError::Engine(e.to_string()))?;
        let mut graphql_request = Request::new(query)
            .variables(Variables::from_json(Value::Object(variables)))
            .data(context);
        if let Some(name) = operation_name {
            graphql_request = graphql_request.operation_name(name);
        }

        let response = self
            .schema
            .execute(graphql_request.root_value(FieldValue::value(root)))
            .await;
        Ok(convert_response(response))
    }
}

fn extension_name(extension: &TypeExtension<'_, String>) -> String {
    match extension {
        TypeExtension::Scalar(ext) => ext.name.clone(),
        TypeExtension::Object(ext) => ext.name.clone(),
        TypeExtension::Interface(ext) => ext.name.clone(),
        TypeExtension::Union(ext) => ext.name.clone(),
        TypeExtension::Enum(ext) => ext.name.clone(),
        TypeExtension::InputObject(ext) => ext.name.clone(),
    }
}

fn type_ref(ty: &sdl::Type<'_, String>) -> TypeRef {
    match ty {
        sdl::Type::NamedType(name) => TypeRef::named(name.clone()),
        sdl::Type::ListType(inner) => TypeRef::List(Box::new(type_ref(inner))),
        sdl::Type::NonNullType(inner) => TypeRef::NonNull(Box::new(type_ref(inner))),
    }
}

fn named_type<'t>(ty: &'t sdl::Type<'_, String>) -> &'t str {
    match ty {
        sdl::Type::NamedType(name) => name,
        sdl::Type::ListType(inner) | sdl::Type::NonNullType(inner) => named_type(inner),
    }
}

fn build_object(
    object: &sdl::ObjectType<'_, String>,
    resolvers: &Resolvers,
    enums: &Arc<HashSet<String>>,
) -> Object {
    object
        .fields
        .iter()
        .fold(Object::new(object.name.clone()), |built, field| {
            let resolver = resolvers.get(&object.name, &field.name);
            let returns_enum = enums.contains(named_type(&field.field_type));
            built.field(build_field(field, resolver, returns_enum))
        })
}

fn build_field(
    field: &sdl::Field<'_, String>,
    resolver: Option<Resolver>,
    returns_enum: bool,
) -> Field {
    let field_name = field.name.clone();
    let built = Field::new(
        field.name.clone(),
        type_ref(&field.field_type),
        move |ctx| {
            FieldFuture::new(resolve_field(
                ctx,
                field_name.clone(),
                resolver.clone(),
                returns_enum,
            ))
        },
    );
    field.arguments.iter().fold(built, |built, argument| {
        built.argument(InputValue::new(
            argument.name.clone(),
            type_ref(&argument.value_type),
        ))
    })
}

async fn resolve_field<'a>(
    ctx: ResolverContext<'a>,
    field_name: String,
    resolver: Option<Resolver>,
    returns_enum: bool,
) -> async_graphql::Result<Option<FieldValue<'a>>> {
    let args = resolver_args(&ctx, field_name)?;
    let value = match resolver {
        Some(resolver) => resolver(args)
            .await
            .map_err(|e| async_graphql::Error::new(e.message))?,
        None => default_resolve(&args),
    };
    let mut value = GraphQLValue::from_json(value)?;
    if returns_enum {
        value = strings_to_enum(value);
    }
    Ok(into_field_value(value))
}

fn resolver_args(
    ctx: &ResolverContext<'_>,
    field_name: String,
) -> async_graphql::Result<ResolverArgs> {
    let parent = match ctx.parent_value.as_value() {
        Some(value) => value.clone().into_json()?,
        None => Value::Null,
    };
    let mut args = Map::new();
    for (name, value) in ctx.args.as_index_map() {
        args.insert(name.to_string(), value.clone().into_json()?);
    }
    let context = ctx.data::<ExecutionContext>()?.clone();
    Ok(ResolverArgs {
        parent,
        args,
        context,
        field_name,
    })
}

fn strings_to_enum(value: GraphQLValue) -> GraphQLValue {
    match value {
        GraphQLValue::String(item) => GraphQLValue::Enum(Name::new(item)),
        GraphQLValue::List(items) => {
            GraphQLValue::List(items.into_iter().map(strings_to_enum).collect())
        }
        other => other,
    }
}

fn into_field_value<'a>(value: GraphQLValue) -> Option<FieldValue<'a>> {
    match value {
        GraphQLValue::Null => None,
        GraphQLValue::List(items) => Some(FieldValue::list(items.into_iter().map(|item| {
            into_field_value(item).unwrap_or_else(|| FieldValue::value(GraphQLValue::Null))
        }))),
        other => Some(FieldValue::value(other)),
    }
}

/// Request-level failures (parse, validation, variable coercion) carry no
/// field path and produce no `data`. Once execution has started, `data` is
/// kept even when a non-null error nulled out the whole result.
fn convert_response(response: async_graphql::Response) -> QueryResponse {
    let errors: Vec<QueryError> = response.errors.into_iter().map(convert_error).collect();
    let executed = errors.is_empty() || errors.iter().any(|error| !error.path.is_empty());
    let data = match response.data.into_json() {
        Ok(Value::Null) if !executed => None,
        Ok(data) => Some(data),
        Err(err) => {
            warn!(error = %err, "Response data is not representable as JSON");
            None
        }
    };
    QueryResponse {
        data,
        errors: (!errors.is_empty()).then_some(errors),
    }
}

fn convert_error(error: ServerError) -> QueryError {
    QueryError {
        message: error.message,
        locations: error
            .locations
            .into_iter()
            .map(|pos| ErrorLocation {
                line: pos.line,
                column: pos.column,
            })
            .collect(),
        path: error
            .path
            .into_iter()
            .map(|segment| match segment {
                PathSegment::Field(name) => Value::String(name),
                PathSegment::Index(index) => Value::from(index),
            })
            .collect(),
    }
}
