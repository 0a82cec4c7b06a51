mod common;

use common::{Alpha, Beta, Gamma, Group, Person, count_rows, person, setup};
use struct2db::{
    CASCADE_CHUNK_SIZE, Constructors, Controller, ControllerError, DeleteMultipleOptions,
    DeleteOptions, MAX_CASCADE_DEPTH, Operation, Result, SaveOptions, field_map,
};

async fn group_with_members(controller: &Controller, name: &str, members: &[&str]) -> Result<Group> {
    let mut group = Group {
        id: 0,
        name: name.to_string(),
        description: String::new(),
    };
    controller.save(&mut group, &SaveOptions::default()).await?;
    for member in members {
        let mut p = person(member, 20, group.id);
        controller.save(&mut p, &SaveOptions::default()).await?;
    }
    Ok(group)
}

fn cycle_constructors() -> Constructors {
    Constructors::new()
        .with("alphas", Alpha::default)
        .with("betas", Beta::default)
        .with("gammas", Gamma::default)
}

#[tokio::test]
async fn test_delete_group_removes_its_persons() -> Result<()> {
    let controller = setup().await;

    let mut admins = group_with_members(&controller, "admins", &["Ann", "Bob"]).await?;
    group_with_members(&controller, "users", &["Cid"]).await?;
    assert_eq!(count_rows(&controller, "persons").await, 3);

    let opts = DeleteOptions {
        constructors: Constructors::new().with("persons", Person::default),
    };
    controller.delete(&mut admins, &opts).await?;

    assert_eq!(admins.id, 0);
    assert_eq!(count_rows(&controller, "groups").await, 1);
    assert_eq!(count_rows(&controller, "persons").await, 1);

    Ok(())
}

#[tokio::test]
async fn test_missing_constructor_skips_relation() -> Result<()> {
    let controller = setup().await;

    let mut admins = group_with_members(&controller, "admins", &["Ann", "Bob"]).await?;
    controller
        .delete(&mut admins, &DeleteOptions::default())
        .await?;

    assert_eq!(count_rows(&controller, "groups").await, 0);
    assert_eq!(count_rows(&controller, "persons").await, 2);

    Ok(())
}

#[tokio::test]
async fn test_cascade_terminates_on_relation_cycle() -> Result<()> {
    let controller = setup().await;

    // a1 <- b1 <- g1 <- a2 <- b2: the chain is longer than the depth bound.
    let mut a1 = Alpha { id: 0, gamma_id: 0 };
    controller.save(&mut a1, &SaveOptions::default()).await?;
    let mut b1 = Beta { id: 0, alpha_id: a1.id };
    controller.save(&mut b1, &SaveOptions::default()).await?;
    let mut g1 = Gamma { id: 0, beta_id: b1.id };
    controller.save(&mut g1, &SaveOptions::default()).await?;
    let mut a2 = Alpha { id: 0, gamma_id: g1.id };
    controller.save(&mut a2, &SaveOptions::default()).await?;
    let mut b2 = Beta { id: 0, alpha_id: a2.id };
    controller.save(&mut b2, &SaveOptions::default()).await?;

    let opts = DeleteOptions {
        constructors: cycle_constructors(),
    };
    controller.delete(&mut a1, &opts).await?;

    // Depths 0, 1, 2 removed b1, g1 and a2; b2 would be depth 3.
    assert_eq!(count_rows(&controller, "alphas").await, 0);
    assert_eq!(count_rows(&controller, "gammas").await, 0);
    assert_eq!(count_rows(&controller, "betas").await, 1);

    let mut survivor = Beta::default();
    controller.load(&mut survivor, &b2.id.to_string()).await?;
    assert_eq!(survivor, b2);

    Ok(())
}

#[tokio::test]
async fn test_cascade_on_self_referencing_cycle() -> Result<()> {
    let controller = setup().await;

    // a -> b -> g -> a again; the bound stops the loop.
    let mut a = Alpha { id: 1, gamma_id: 1 };
    controller.save(&mut a, &SaveOptions::default()).await?;
    let mut b = Beta { id: 1, alpha_id: 1 };
    controller.save(&mut b, &SaveOptions::default()).await?;
    let mut g = Gamma { id: 1, beta_id: 1 };
    controller.save(&mut g, &SaveOptions::default()).await?;

    let opts = DeleteOptions {
        constructors: cycle_constructors(),
    };
    controller.delete(&mut a, &opts).await?;

    assert_eq!(count_rows(&controller, "alphas").await, 0);
    assert_eq!(count_rows(&controller, "betas").await, 0);
    assert_eq!(count_rows(&controller, "gammas").await, 0);

    Ok(())
}

#[tokio::test]
async fn test_delete_multiple_cascades_from_given_depth() -> Result<()> {
    let controller = setup().await;

    let admins = group_with_members(&controller, "admins", &["Ann", "Bob"]).await?;
    group_with_members(&controller, "users", &["Cid"]).await?;

    let opts = DeleteMultipleOptions {
        filters: field_map([("name", "admins")]),
        cascade_delete_depth: MAX_CASCADE_DEPTH - 1,
        constructors: Constructors::new().with("persons", Person::default),
        ..Default::default()
    };
    let deleted = controller.delete_multiple(Group::default, &opts).await?;

    assert_eq!(deleted, vec![admins.id]);
    assert_eq!(count_rows(&controller, "groups").await, 1);
    assert_eq!(count_rows(&controller, "persons").await, 1);

    Ok(())
}

#[tokio::test]
async fn test_delete_multiple_at_max_depth_skips_cascade() -> Result<()> {
    let controller = setup().await;

    group_with_members(&controller, "admins", &["Ann", "Bob"]).await?;

    let opts = DeleteMultipleOptions {
        cascade_delete_depth: MAX_CASCADE_DEPTH,
        constructors: Constructors::new().with("persons", Person::default),
        ..Default::default()
    };
    let deleted = controller.delete_multiple(Group::default, &opts).await?;

    assert_eq!(deleted.len(), 1);
    assert_eq!(count_rows(&controller, "groups").await, 0);
    assert_eq!(count_rows(&controller, "persons").await, 2);

    Ok(())
}

#[tokio::test]
async fn test_cascade_failure_is_wrapped_after_parent_delete() -> Result<()> {
    let controller = setup().await;

    let mut admins = group_with_members(&controller, "admins", &["Ann"]).await?;
    let group_id = admins.id;
    controller
        .connection()
        .execute_batch("DROP TABLE persons")
        .await
        .expect("drop child table");

    let opts = DeleteOptions {
        constructors: Constructors::new().with("persons", Person::default),
    };
    let err = controller.delete(&mut admins, &opts).await.unwrap_err();

    match &err {
        ControllerError::Cascade {
            relation,
            depth,
            parent_ids,
            source,
        } => {
            assert_eq!(relation, "persons");
            assert_eq!(*depth, 0);
            assert_eq!(parent_ids, &vec![group_id]);
            assert!(matches!(
                **source,
                ControllerError::Query {
                    op: Operation::CascadeDelete,
                    ..
                }
            ));
        }
        other => panic!("Expected Cascade, got {:?}", other),
    }
    // The parent row is gone regardless.
    assert_eq!(count_rows(&controller, "groups").await, 0);
    assert_eq!(admins.id, 0);

    Ok(())
}

#[tokio::test]
async fn test_cascade_over_more_parents_than_bind_parameters() -> Result<()> {
    let controller = setup().await;

    // More groups than SQLite accepts as variables in one statement.
    controller
        .connection()
        .execute_batch(
            "INSERT INTO groups (id, name, description)
             WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < 33000)
             SELECT n, 'g' || n, '' FROM seq;",
        )
        .await
        .expect("seed groups");
    for group_id in [1, 16_500, 33_000] {
        let mut p = person("Ann", 20, group_id);
        controller.save(&mut p, &SaveOptions::default()).await?;
    }

    let opts = DeleteMultipleOptions {
        constructors: Constructors::new().with("persons", Person::default),
        ..Default::default()
    };
    let deleted = controller.delete_multiple(Group::default, &opts).await?;

    assert_eq!(deleted.len(), 33_000);
    assert_eq!(count_rows(&controller, "groups").await, 0);
    assert_eq!(count_rows(&controller, "persons").await, 0);

    Ok(())
}

#[tokio::test]
async fn test_cascade_merges_children_across_chunks() -> Result<()> {
    let controller = setup().await;

    let mut alpha = Alpha { id: 0, gamma_id: 0 };
    controller.save(&mut alpha, &SaveOptions::default()).await?;
    for _ in 0..CASCADE_CHUNK_SIZE + 5 {
        let mut beta = Beta { id: 0, alpha_id: alpha.id };
        controller.save(&mut beta, &SaveOptions::default()).await?;
        let mut gamma = Gamma { id: 0, beta_id: beta.id };
        controller.save(&mut gamma, &SaveOptions::default()).await?;
    }

    let opts = DeleteOptions {
        constructors: cycle_constructors(),
    };
    controller.delete(&mut alpha, &opts).await?;

    assert_eq!(count_rows(&controller, "betas").await, 0);
    assert_eq!(count_rows(&controller, "gammas").await, 0);

    Ok(())
}
