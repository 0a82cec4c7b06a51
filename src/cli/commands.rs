use super::models::{self, Group, Person};
use super::{Command, Entity};
use anyhow::{Context, Result, anyhow, bail};
use struct2db::{
    Constructors, Controller, DeleteMultipleOptions, DeleteOptions, FieldMap, GetCountOptions,
    GetOptions, Order, RawFilter, Record, SaveOptions, StringMap, UpdateMultipleOptions, Value,
    introspect,
};

pub async fn run(controller: &Controller, command: Command) -> Result<()> {
    match command {
        Command::Init => init(controller).await,
        Command::AddGroup { name, description } => {
            let mut group = Group {
                id: 0,
                name,
                description,
            };
            controller.save(&mut group, &SaveOptions::default()).await?;
            print_record(controller, &group)
        }
        Command::AddPerson {
            name,
            email,
            age,
            inactive,
            group_id,
        } => {
            let mut person = Person {
                id: 0,
                name,
                email,
                age,
                active: !inactive,
                group_id,
            };
            controller.save(&mut person, &SaveOptions::default()).await?;
            print_record(controller, &person)
        }
        Command::List {
            entity,
            filters,
            raw,
            args,
            or,
            order,
            limit,
            offset,
        } => {
            let raw = raw.map(|predicate| {
                let filter = RawFilter::new(&predicate, args.iter().map(|a| parse_arg(a)).collect());
                if or { filter.or() } else { filter }
            });
            let order = order.iter().map(|o| parse_order(o)).collect();
            match entity {
                Entity::Groups => {
                    let opts = GetOptions {
                        filters: parse_pairs(&Group::default(), controller, &filters)?,
                        raw,
                        order,
                        limit,
                        offset,
                    };
                    list(controller, Group::default, &opts).await
                }
                Entity::Persons => {
                    let opts = GetOptions {
                        filters: parse_pairs(&Person::default(), controller, &filters)?,
                        raw,
                        order,
                        limit,
                        offset,
                    };
                    list(controller, Person::default, &opts).await
                }
            }
        }
        Command::Count { entity, filters } => {
            let count = match entity {
                Entity::Groups => {
                    let opts = GetCountOptions {
                        filters: parse_pairs(&Group::default(), controller, &filters)?,
                        raw: None,
                    };
                    controller.get_count(Group::default, &opts).await?
                }
                Entity::Persons => {
                    let opts = GetCountOptions {
                        filters: parse_pairs(&Person::default(), controller, &filters)?,
                        raw: None,
                    };
                    controller.get_count(Person::default, &opts).await?
                }
            };
            println!("{}", count);
            Ok(())
        }
        Command::UpdatePersons { values, filters } => {
            let values: FieldMap = split_pairs(&values)?
                .into_iter()
                .map(|(k, v)| (k, Value::Text(v)))
                .collect();
            let opts = UpdateMultipleOptions {
                filters: parse_pairs(&Person::default(), controller, &filters)?,
                raw: None,
                convert_values_from_string: true,
            };
            controller
                .update_multiple(Person::default, &values, &opts)
                .await?;
            tracing::info!("persons updated");
            Ok(())
        }
        Command::DeleteGroup { id } => {
            let mut group = Group::default();
            controller.load(&mut group, &id).await?;
            if group.id == 0 {
                bail!("group {} not found", id);
            }
            let opts = DeleteOptions {
                constructors: constructors(),
            };
            controller.delete(&mut group, &opts).await?;
            tracing::info!(id = %id, "group deleted");
            Ok(())
        }
        Command::DeletePersons { filters } => {
            let opts = DeleteMultipleOptions {
                filters: parse_pairs(&Person::default(), controller, &filters)?,
                constructors: constructors(),
                ..Default::default()
            };
            let ids = controller.delete_multiple(Person::default, &opts).await?;
            println!("{}", serde_json::to_string(&ids)?);
            Ok(())
        }
    }
}

fn constructors() -> Constructors {
    Constructors::new().with("persons", Person::default)
}

async fn init(controller: &Controller) -> Result<()> {
    let registry = controller.registry();
    let ddl = models::ddl(registry.options().dialect, &registry.options().table_prefix);
    controller
        .connection()
        .execute_batch(&ddl)
        .await
        .context("failed to create demo tables")?;
    controller.register(&Group::default(), None, false)?;
    controller.register(&Person::default(), None, false)?;
    tracing::info!("demo tables ready");
    Ok(())
}

async fn list<R, F>(controller: &Controller, factory: F, opts: &GetOptions) -> Result<()>
where
    R: Record,
    F: Fn() -> R,
{
    let generator = controller.registry().resolve(&factory())?;
    let rows = controller
        .get_with(factory, opts, |record| introspect::to_json(generator.schema(), &record))
        .await?;
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn print_record(controller: &Controller, record: &dyn Record) -> Result<()> {
    let generator = controller.registry().resolve(record)?;
    let json = introspect::to_json(generator.schema(), record);
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn split_pairs(pairs: &[String]) -> Result<StringMap> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .ok_or_else(|| anyhow!("expected field=value, got '{}'", pair))
        })
        .collect()
}

/// Typed filter map; keys the record does not have, or values that do not
/// parse, are an error here rather than silently dropped.
fn parse_pairs(record: &dyn Record, controller: &Controller, pairs: &[String]) -> Result<FieldMap> {
    let input = split_pairs(pairs)?;
    let typed = controller.string_to_field_values(record, &input);
    let dropped: Vec<&str> = input
        .keys()
        .filter(|k| !typed.contains_key(*k))
        .map(String::as_str)
        .collect();
    if !dropped.is_empty() {
        bail!("invalid filter fields: {}", dropped.join(", "));
    }
    Ok(typed)
}

fn parse_arg(arg: &str) -> Value {
    match arg {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        _ => arg
            .parse::<i64>()
            .map(Value::Integer)
            .unwrap_or_else(|_| Value::from(arg)),
    }
}

fn parse_order(term: &str) -> Order {
    match term.split_once(':') {
        Some((field, dir)) if dir.eq_ignore_ascii_case("desc") => Order::desc(field),
        Some((field, _)) => Order::asc(field),
        None => Order::asc(term),
    }
}
