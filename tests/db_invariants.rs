use sqlx::PgPool;
use time::{Duration, OffsetDateTime};

use yatube::application::pagination::PageRequest;
use yatube::application::repos::{
    CreateGroupParams, CreatePostParams, CreateSessionParams, CreateUserParams, GroupsRepo,
    GroupsWriteRepo, HealthRepo, PostFilter, PostsRepo, PostsWriteRepo, RepoError, SessionsRepo,
    UpdatePostParams, UsersRepo, UsersWriteRepo,
};
use yatube::domain::entities::{GroupRecord, UserRecord};
use yatube::infra::db::PostgresRepositories;

async fn seed_user(repos: &PostgresRepositories, username: &str) -> UserRecord {
    repos
        .create_user(CreateUserParams {
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            password_hash: "hash".to_string(),
        })
        .await
        .expect("user inserted")
}

async fn seed_group(repos: &PostgresRepositories, slug: &str) -> GroupRecord {
    repos
        .create_group(CreateGroupParams {
            title: format!("Group {slug}"),
            slug: slug.to_string(),
            description: "desc".to_string(),
        })
        .await
        .expect("group inserted")
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_a_user_cascades_to_posts_and_sessions(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let user = seed_user(&repos, "leo").await;
    let post = repos
        .create_post(CreatePostParams {
            author_id: user.id,
            text: "bye".to_string(),
            group_id: None,
        })
        .await
        .expect("post inserted");
    repos
        .create_session(CreateSessionParams {
            user_id: user.id,
            prefix: "abcdefabcdef".to_string(),
            secret_hash: vec![7; 32],
            expires_at: OffsetDateTime::now_utc() + Duration::hours(1),
        })
        .await
        .expect("session inserted");

    assert!(repos.delete_user("leo").await.expect("delete"));

    assert!(PostsRepo::find_by_id(&repos, post.id).await.expect("lookup").is_none());
    assert!(
        repos
            .find_by_prefix("abcdefabcdef")
            .await
            .expect("lookup")
            .is_none()
    );
    assert!(!repos.delete_user("leo").await.expect("second delete"));
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_a_group_clears_it_from_posts(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let user = seed_user(&repos, "leo").await;
    let group = seed_group(&repos, "cats").await;
    let post = repos
        .create_post(CreatePostParams {
            author_id: user.id,
            text: "stays".to_string(),
            group_id: Some(group.id),
        })
        .await
        .expect("post inserted");
    assert_eq!(post.group.as_ref().map(|g| g.id), Some(group.id));

    assert!(repos.delete_group("cats").await.expect("delete"));

    let post = PostsRepo::find_by_id(&repos, post.id)
        .await
        .expect("lookup")
        .expect("post survives");
    assert!(post.group.is_none());
    assert!(repos.find_by_slug("cats").await.expect("lookup").is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_slugs_and_usernames_are_rejected(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    seed_group(&repos, "cats").await;
    seed_user(&repos, "leo").await;

    let err = repos
        .create_group(CreateGroupParams {
            title: "Other cats".to_string(),
            slug: "cats".to_string(),
            description: "desc".to_string(),
        })
        .await
        .expect_err("slug must be unique");
    assert!(matches!(err, RepoError::Duplicate { .. }));

    let err = repos
        .create_user(CreateUserParams {
            username: "leo".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            password_hash: "hash".to_string(),
        })
        .await
        .expect_err("username must be unique");
    assert!(matches!(err, RepoError::Duplicate { .. }));
}

#[sqlx::test(migrations = "./migrations")]
async fn listings_are_filtered_ordered_and_sliced(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let leo = seed_user(&repos, "leo").await;
    let anna = seed_user(&repos, "anna").await;
    let cats = seed_group(&repos, "cats").await;

    let mut cat_posts = Vec::new();
    for n in 0..13 {
        let post = repos
            .create_post(CreatePostParams {
                author_id: leo.id,
                text: format!("cat {n}"),
                group_id: Some(cats.id),
            })
            .await
            .expect("post inserted");
        cat_posts.push(post.id);
    }
    repos
        .create_post(CreatePostParams {
            author_id: anna.id,
            text: "loose".to_string(),
            group_id: None,
        })
        .await
        .expect("post inserted");

    assert_eq!(repos.count_posts(PostFilter::All).await.expect("count"), 14);
    assert_eq!(
        repos
            .count_posts(PostFilter::Group(cats.id))
            .await
            .expect("count"),
        13
    );
    assert_eq!(
        repos
            .count_posts(PostFilter::Author(anna.id))
            .await
            .expect("count"),
        1
    );

    let first = repos
        .list_posts(PostFilter::Group(cats.id), PageRequest::new(10, 0))
        .await
        .expect("page one");
    let second = repos
        .list_posts(PostFilter::Group(cats.id), PageRequest::new(10, 10))
        .await
        .expect("page two");
    assert_eq!(first.len(), 10);
    assert_eq!(second.len(), 3);

    let listed: Vec<i64> = first.iter().chain(second.iter()).map(|p| p.id).collect();
    let mut newest_first = cat_posts.clone();
    newest_first.reverse();
    assert_eq!(listed, newest_first);
}

#[sqlx::test(migrations = "./migrations")]
async fn updates_keep_author_and_publication_date(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let user = seed_user(&repos, "leo").await;
    let group = seed_group(&repos, "cats").await;
    let post = repos
        .create_post(CreatePostParams {
            author_id: user.id,
            text: "before".to_string(),
            group_id: None,
        })
        .await
        .expect("post inserted");

    let updated = repos
        .update_post(UpdatePostParams {
            id: post.id,
            text: "after".to_string(),
            group_id: Some(group.id),
        })
        .await
        .expect("post updated");

    assert_eq!(updated.text, "after");
    assert_eq!(updated.author.id, user.id);
    assert_eq!(updated.pub_date, post.pub_date);
    assert_eq!(updated.group.map(|g| g.slug).as_deref(), Some("cats"));

    let missing = repos
        .update_post(UpdatePostParams {
            id: post.id + 1000,
            text: "nothing".to_string(),
            group_id: None,
        })
        .await;
    assert!(matches!(missing, Err(RepoError::NotFound)));
}

#[sqlx::test(migrations = "./migrations")]
async fn expired_sessions_are_purged(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let user = seed_user(&repos, "leo").await;
    let now = OffsetDateTime::now_utc();

    for (prefix, expires_at) in [
        ("aaaaaaaaaaaa", now - Duration::hours(1)),
        ("bbbbbbbbbbbb", now + Duration::hours(1)),
    ] {
        repos
            .create_session(CreateSessionParams {
                user_id: user.id,
                prefix: prefix.to_string(),
                secret_hash: vec![1; 32],
                expires_at,
            })
            .await
            .expect("session inserted");
    }

    assert_eq!(repos.purge_expired(now).await.expect("purge"), 1);
    assert!(
        repos
            .find_by_prefix("bbbbbbbbbbbb")
            .await
            .expect("lookup")
            .is_some()
    );
    assert!(
        UsersRepo::find_by_id(&repos, user.id)
            .await
            .expect("lookup")
            .is_some()
    );
    repos.health_check().await.expect("database reachable");
}

#[sqlx::test(migrations = "./migrations")]
async fn groups_are_listed_and_found(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let dogs = seed_group(&repos, "dogs").await;
    seed_group(&repos, "cats").await;

    let all = repos.list_all().await.expect("list");
    assert_eq!(all.len(), 2);

    let found = GroupsRepo::find_by_id(&repos, dogs.id)
        .await
        .expect("lookup")
        .expect("group exists");
    assert_eq!(found.slug, "dogs");
}
