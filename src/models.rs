use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub profile_name: String,
    pub profile_image: String,
    pub monthly_food_budget: Option<i64>,
    pub role: String,
}

#[derive(Serialize)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub profile_name: String,
    pub profile_image: String,
    pub monthly_food_budget: Option<i64>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser {
            id: user.id,
            username: user.username,
            profile_name: user.profile_name,
            profile_image: user.profile_image,
            monthly_food_budget: user.monthly_food_budget,
        }
    }
}

#[derive(Deserialize)]
pub struct RegisterPayload {
    pub username: String,
    pub password: String,
    pub name: String,
    pub profile_image: Option<String>,
    pub monthly_food_budget: Option<i64>,
}

#[derive(Deserialize)]
pub struct LoginPayload {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
    pub username: String,
    pub profile_name: String,
    pub profile_image: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordPayload {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct UpdateProfilePayload {
    pub profile_name: Option<String>,
    pub profile_image: Option<String>,
    pub monthly_food_budget: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FoodExpense {
    pub id: String,
    pub budget_goal_id: Option<String>,
    pub amount: i64,
    pub date: String,
    pub description: Option<String>,
    pub meal_type: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateExpensePayload {
    pub amount: i64,
    pub date: String,
    pub description: Option<String>,
    pub meal_type: Option<String>,
    pub budget_goal_id: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateExpensePayload {
    pub amount: Option<i64>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub meal_type: Option<String>,
    pub budget_goal_id: Option<String>,
}

#[derive(Deserialize)]
pub struct DateRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Deserialize)]
pub struct PeriodQuery {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Serialize)]
pub struct ExpenseTotalResponse {
    pub total: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BudgetGoal {
    pub id: String,
    pub target_amount: i64,
    pub start_date: String,
    pub end_date: String,
    pub spent_amount: i64,
    pub remaining_amount: i64,
    pub progress_percentage: f64,
}

#[derive(Deserialize)]
pub struct CreateBudgetGoalPayload {
    pub target_amount: i64,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Deserialize)]
pub struct UpdateBudgetGoalPayload {
    pub target_amount: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MealPlan {
    pub id: String,
    pub date: String,
    pub breakfast: Option<String>,
    pub lunch: Option<String>,
    pub dinner: Option<String>,
    pub estimated_cost: Option<i64>,
    pub ai_generated: bool,
}

#[derive(Deserialize)]
pub struct CreateMealPlanPayload {
    pub date: String,
    pub breakfast: Option<String>,
    pub lunch: Option<String>,
    pub dinner: Option<String>,
    pub estimated_cost: Option<i64>,
    #[serde(default)]
    pub ai_generated: bool,
}

#[derive(Deserialize)]
pub struct UpdateMealPlanPayload {
    pub breakfast: Option<String>,
    pub lunch: Option<String>,
    pub dinner: Option<String>,
    pub estimated_cost: Option<i64>,
    #[serde(default)]
    pub ai_generated: bool,
}

#[derive(Deserialize)]
pub struct DateQuery {
    pub date: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct PostAuthor {
    pub id: String,
    pub username: String,
    pub profile_name: String,
    pub profile_image: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub view_count: i64,
    pub like_count: i64,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub author: PostAuthor,
}

#[derive(Deserialize)]
pub struct CreatePostPayload {
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdatePostPayload {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Deserialize)]
pub struct GetPostsQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Deserialize)]
pub struct SearchPostsQuery {
    pub keyword: String,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Serialize)]
pub struct GetPostsResponse {
    pub posts: Vec<Post>,
    pub total_count: u32,
}

#[derive(Serialize, Debug, Clone)]
pub struct RankingEntry {
    pub user_id: String,
    pub username: String,
    pub profile_name: String,
    pub profile_image: String,
    pub total_amount: i64,
    pub rank: u32,
}
